//! Configuration types and loading for the advisor service

mod loader;
mod provider;

pub use loader::{AdvisorConfig, Coordinates, Providers};
pub use provider::ProviderConfig;
