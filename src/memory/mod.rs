//! Knowledge memory - persistent records, similarity search and weather cache

mod base;
mod ranking;
mod schema;
mod seed;
mod store;
mod weather_cache;

pub use base::{DEFAULT_LOCATION_BOOST, KnowledgeBase};
#[cfg(test)]
pub use ranking::dot;
pub use seed::SeedFile;

use crate::providers::ProviderError;
use thiserror::Error;

/// Errors from the knowledge base
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("failed to open knowledge database at {path}: {source}")]
    Open {
        path: String,
        source: rusqlite::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("embedding failed: {0}")]
    Embedding(#[from] ProviderError),

    #[error("invalid seed file {path}: {message}")]
    Seed { path: String, message: String },

    #[error("knowledge base lock poisoned")]
    Poisoned,
}
