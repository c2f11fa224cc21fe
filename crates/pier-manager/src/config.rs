//! TOML configuration for the lifecycle manager.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Errors loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the file failed.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Manager configuration, parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Root directory of the shard store. The migration marker lives here;
    /// embedders typically place the engine's transient/index/datastore
    /// directories under it as well.
    pub root_dir: PathBuf,
    /// Interval in milliseconds between garbage-collection passes.
    pub gc_interval_ms: u64,
    /// Maximum concurrent indexing jobs. Forwarded by the embedder to its
    /// engine; the manager does not enforce it.
    pub max_concurrent_index: usize,
    /// Maximum concurrent fetches of shards whose transients are already
    /// warm. Forwarded to the engine like `max_concurrent_index`.
    pub max_concurrent_ready_fetches: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(".pier"),
            gc_interval_ms: 60_000,
            max_concurrent_index: 5,
            max_concurrent_ready_fetches: 0,
        }
    }
}

impl ManagerConfig {
    /// The GC interval as a [`Duration`].
    pub fn gc_interval(&self) -> Duration {
        Duration::from_millis(self.gc_interval_ms)
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}
