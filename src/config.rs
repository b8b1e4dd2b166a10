use crate::remote::session_handle::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_STREAM_CAPACITY};
use crate::remote::SessionSettings;
use crate::sensor::sysfs::DEFAULT_SYSFS_ROOT;
use crate::sensor::InPort;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const CONFIG_ENV_VAR: &str = "EV3_REMOTE_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {reason}", .path.display())]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Settings of the `ev3-remote` binary
///
/// ```toml
/// port = "in2"
/// poll_interval_ms = 250
/// stream_capacity = 50
/// sysfs_root = "/sys/class/lego-sensor"
/// ```
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// Port the infrared sensor is plugged into
    pub port: InPort,
    pub poll_interval_ms: u64,
    pub stream_capacity: usize,
    pub sysfs_root: PathBuf,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            port: InPort::In2,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
        }
    }
}

impl RemoteConfig {
    /// Loads the configuration
    ///
    /// Lookup order: `path`, then `$EV3_REMOTE_CONFIG`, then
    /// `<config dir>/ev3-remote/config.toml` if it exists, then defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        let candidate = match explicit {
            Some(path) => Some(path),
            None => Self::default_path().filter(|path| path.exists()),
        };

        match candidate {
            Some(path) => Self::from_file(&path),
            None => {
                info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ev3-remote").join("config.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.stream_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "stream_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            stream_capacity: self.stream_capacity,
        }
    }
}
