//! Daemon configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use swarm_types::{ParamsError, SwarmParams};
use swarm_utils::LogFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(String),

    #[error("invalid engine parameters: {0}")]
    Params(#[from] ParamsError),
}

/// Configuration for the swarm daemon.
///
/// Loaded from a TOML file via [`SwarmConfig::from_toml_file`]; every field
/// has a default so an empty file is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Directory holding the LMDB event log.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter, e.g. "info" or "info,swarm_consensus=debug".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between expiry sweeps in `run`.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Engine parameters.
    #[serde(default)]
    pub params: SwarmParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./swarm_data")
}

fn default_map_size_mb() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    30
}

// ── Impl ───────────────────────────────────────────────────────────────

impl SwarmConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.params.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// LMDB map size in bytes.
    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    /// Where the event log lives inside the data directory.
    pub fn event_log_path(&self) -> PathBuf {
        self.data_dir.join("events")
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            sweep_interval_secs: default_sweep_interval_secs(),
            params: SwarmParams::default(),
        }
    }
}
