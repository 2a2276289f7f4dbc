//! CLI module for krishi
//!
//! This module provides:
//! - Command implementations (serve, doctor, seed, search, questions)
//! - Output handlers (console, JSON, quiet)
//! - Signal handling for graceful shutdown

pub mod commands;
pub mod output;
pub mod signals;

pub use commands::{doctor, questions, search, seed, serve};
pub use output::{OutputMode, create_handler};
