//! Configuration types for clustermeta
//!
//! Loaded from TOML; every section and field falls back to its default.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration for clustermeta
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Metadata layer configuration
    pub metadata: MetadataConfig,
    /// Store configuration
    pub store: StoreConfig,
}

impl Config {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Error::Configuration(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.store.max_compute_attempts == 0 {
            return Err(Error::Configuration(
                "store.max_compute_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Metadata layer configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Skip the store round-trip when a request changed nothing
    pub skip_noop_commits: bool,
    /// Timeout assigned to new sessions (seconds, 0 = never expire)
    pub default_session_timeout_secs: u64,
}

impl MetadataConfig {
    /// Default session timeout as a duration
    #[must_use]
    pub const fn default_session_timeout(&self) -> Duration {
        Duration::from_secs(self.default_session_timeout_secs)
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            skip_noop_commits: true,
            default_session_timeout_secs: 30 * 60, // 30 minutes
        }
    }
}

/// Store configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Attempts an optimistic compute makes before reporting contention
    pub max_compute_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_compute_attempts: 16,
        }
    }
}
