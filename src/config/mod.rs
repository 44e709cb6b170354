pub mod station;

pub use station::{AgentProfile, Config, McpServerConfig, Provider, Station};

use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to locate config directory")]
    NoConfigDir,

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No station with id '{0}' in config (check default_station)")]
    UnknownStation(String),
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::NoConfigDir)?
        .join("toolchat");
    Ok(config_dir.join("config.toml"))
}

/// Load configuration from the default path.
///
/// The session cannot start without a valid config, so a missing or
/// malformed file is a hard error rather than a silently created default.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path()?)
}

/// Load configuration from an explicit path
pub fn load_config_from(path: &PathBuf) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    Ok(config)
}
