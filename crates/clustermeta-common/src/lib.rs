//! clustermeta Common - Shared types and utilities
//!
//! This crate provides the identifier and time types, the error
//! definitions and the configuration used across all clustermeta crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
