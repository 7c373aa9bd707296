// crates/cadence-daemon/src/config.rs
//
// Runtime configuration for the Cadence daemon.
// Loaded from a TOML file or populated with sensible defaults.
//
// Example:
//
//   storage = "rocksdb"
//   data_dir = "~/.cadence/data"
//   block_interval_ms = 500
//   block_time_step_secs = 3600
//
//   [[epochs]]
//   identifier = "day"
//   duration_secs = 86400
//
//   [[epochs]]
//   identifier = "week"
//   duration_secs = 604800
//   start_time = "2024-01-01T00:00:00Z"

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use cadence_core::error::CadenceError;
use cadence_epochs::{GenesisEpoch, GenesisState};

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Storage backend: "rocksdb" or "memory".
    #[serde(default = "default_storage")]
    pub storage: String,

    /// Directory for local data storage (RocksDB).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Wall-clock delay between simulated blocks.
    #[serde(default = "default_block_interval_ms")]
    pub block_interval_ms: u64,

    /// Simulated block time advanced per block, in seconds.
    #[serde(default = "default_block_time_step_secs")]
    pub block_time_step_secs: u64,

    /// Block time of the first simulated block. Defaults to the current time.
    /// Must be a quoted RFC 3339 string.
    #[serde(default)]
    pub genesis_time: Option<DateTime<Utc>>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Tracked epoch identifiers. Empty means the default "day"/"week" genesis.
    #[serde(default)]
    pub epochs: Vec<EpochConfig>,
}

/// One `[[epochs]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EpochConfig {
    pub identifier: String,
    pub duration_secs: u64,
    /// Quoted RFC 3339 timestamp; counting waits until this block time.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Number given to the first epoch (0 or 1 are typical).
    #[serde(default)]
    pub current_epoch: u64,
}

fn default_storage() -> String {
    "rocksdb".to_string()
}

fn default_data_dir() -> String {
    "~/.cadence/data".to_string()
}

fn default_block_interval_ms() -> u64 {
    1000
}

fn default_block_time_step_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            data_dir: default_data_dir(),
            block_interval_ms: default_block_interval_ms(),
            block_time_step_secs: default_block_time_step_secs(),
            genesis_time: None,
            log_level: default_log_level(),
            epochs: Vec::new(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// read, parsed, or validated is a configuration error.
    pub fn load(path: &str) -> Result<Self, CadenceError> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CadenceError::Config(format!("Failed to read {}: {}", path, e)))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, CadenceError> {
        let config: DaemonConfig = toml::from_str(contents)
            .map_err(|e| CadenceError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that are not covered by genesis validation.
    pub fn validate(&self) -> Result<(), CadenceError> {
        match self.storage.as_str() {
            "rocksdb" | "memory" => {}
            other => {
                return Err(CadenceError::Config(format!(
                    "Unknown storage backend '{}'. Use 'rocksdb' or 'memory'.",
                    other
                )))
            }
        }
        if self.block_interval_ms == 0 {
            return Err(CadenceError::Config("block_interval_ms must be positive".to_string()));
        }
        self.genesis().validate()
    }

    /// Genesis document described by the `[[epochs]]` entries.
    pub fn genesis(&self) -> GenesisState {
        if self.epochs.is_empty() {
            return GenesisState::default();
        }

        let epochs = self
            .epochs
            .iter()
            .map(|entry| {
                let mut epoch = GenesisEpoch::new(entry.identifier.clone(), Duration::from_secs(entry.duration_secs))
                    .with_current_epoch(entry.current_epoch);
                if let Some(start_time) = entry.start_time {
                    epoch = epoch.with_start_time(start_time);
                }
                epoch
            })
            .collect();
        GenesisState::new(epochs)
    }

    pub fn block_interval(&self) -> Duration {
        Duration::from_millis(self.block_interval_ms)
    }

    pub fn block_time_step(&self) -> Duration {
        Duration::from_secs(self.block_time_step_secs)
    }
}
