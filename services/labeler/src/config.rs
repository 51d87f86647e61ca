//! Configuration for the labeler.

use std::path::{Path, PathBuf};

use plabel_facts::LabelConfig;
use thiserror::Error;

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },

    #[error("failed to read label config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid label config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Labeler configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity of the local worker the binary labels.
    pub worker_name: String,

    /// Optional TOML file holding the label config.
    pub label_config_path: Option<PathBuf>,

    /// Seconds between forced refreshes; 0 disables them.
    pub refresh_interval_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let worker_name = std::env::var("PLABEL_WORKER_NAME")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "local".to_string());

        let label_config_path = std::env::var("PLABEL_LABEL_CONFIG")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let refresh_interval_secs = match std::env::var("PLABEL_REFRESH_INTERVAL") {
            Ok(value) => value.trim().parse().map_err(|_| ConfigError::InvalidVar {
                var: "PLABEL_REFRESH_INTERVAL",
                value,
            })?,
            Err(_) => 0,
        };

        let log_level = std::env::var("PLABEL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            worker_name,
            label_config_path,
            refresh_interval_secs,
            log_level,
        })
    }

    /// Load the label config, or the default when no file is configured.
    pub fn load_label_config(&self) -> Result<LabelConfig, ConfigError> {
        match &self.label_config_path {
            Some(path) => read_label_config(path),
            None => Ok(LabelConfig::default()),
        }
    }
}

/// Read a label config from a TOML file.
pub fn read_label_config(path: &Path) -> Result<LabelConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_label_config(&text)
}

/// Parse a label config. Keys left out keep their defaults.
///
/// ```toml
/// architecture = true
/// name_version = false
/// windows_feature_update = false
/// ```
pub fn parse_label_config(text: &str) -> Result<LabelConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}
