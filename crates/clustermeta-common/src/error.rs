//! Error types for clustermeta
//!
//! This module defines the common error types used throughout the system.

use thiserror::Error;

/// Common result type for clustermeta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for clustermeta
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // Construction errors
    #[error("invalid schedule expression: {0}")]
    InvalidSchedule(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Store errors
    #[error("no metadata entry for key {key}")]
    MissingEntry { key: String },

    #[error("metadata entry already exists for key {key}")]
    AlreadyExists { key: String },

    #[error("concurrent update of {key} did not settle after {attempts} attempts")]
    Contention { key: String, attempts: u32 },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    // Codec errors
    #[error("encode error: {0}")]
    Encode(String),

    #[error("decode error: {0}")]
    Decode(String),

    // Internal errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an invalid schedule error
    pub fn invalid_schedule(msg: impl Into<String>) -> Self {
        Self::InvalidSchedule(msg.into())
    }

    /// Create a missing entry error for the given key
    pub fn missing_entry(key: impl ToString) -> Self {
        Self::MissingEntry {
            key: key.to_string(),
        }
    }

    /// Create an already exists error for the given key
    pub fn already_exists(key: impl ToString) -> Self {
        Self::AlreadyExists {
            key: key.to_string(),
        }
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an encode error
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a store unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Check if this is a retryable error
    ///
    /// The mutator never retries on its own; this lets the caller decide.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Contention { .. } | Self::StoreUnavailable(_))
    }

    /// Check if this is a not found error
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::MissingEntry { .. })
    }
}
