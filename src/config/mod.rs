//! Configuration management

mod schema;

pub use schema::{ActionKind, Config, FolderConfig, GeneralConfig, RuleConfig};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Example configuration written by `filesweep init`
pub const EXAMPLE_CONFIG: &str = include_str!("../../config-sample.toml");

impl Config {
    /// Load configuration from a file or the default location
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(Self::default_path)
            .ok_or(ConfigError::NoDefaultPath)?;

        if !config_path.exists() {
            return Err(ConfigError::NotFound(config_path));
        }

        let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;

        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: config_path,
            source,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get the default config file path
    /// Uses the platform config directory (via dirs::config_dir), falling back to ~/.config
    pub fn default_path() -> Option<PathBuf> {
        let config_base =
            dirs::config_dir().or_else(|| dirs::home_dir().map(|d| d.join(".config")))?;
        Some(config_base.join("filesweep").join("config.toml"))
    }

    /// Write the example configuration, refusing to replace an existing file
    pub fn write_example(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(path, EXAMPLE_CONFIG).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
