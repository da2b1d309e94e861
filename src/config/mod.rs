//! Configuration module
//!
//! Handles loading and saving axiomwire configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::network::NetworkConfig;
use crate::protocol::{DEFAULT_ENDPOINT, DEFAULT_SUBPROTOCOL};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,
}

/// General configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Game server endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Sub-protocol requested at handshake
    #[serde(default = "default_subprotocol")]
    pub subprotocol: String,
    /// Connection timeout in ms
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_subprotocol() -> String {
    DEFAULT_SUBPROTOCOL.to_string()
}

fn default_connect_timeout() -> u64 {
    5000
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            subprotocol: default_subprotocol(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("axiomwire/config.toml")),
            Some(PathBuf::from("./axiomwire.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Network settings for a connection
    pub fn network(&self) -> NetworkConfig {
        NetworkConfig {
            endpoint: self.connection.endpoint.clone(),
            subprotocol: self.connection.subprotocol.clone(),
            connect_timeout_ms: self.connection.connect_timeout_ms,
        }
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    let config = Config {
        general: GeneralConfig { verbose: false },
        connection: ConnectionConfig {
            endpoint: "wss://game.example.com/ws".to_string(),
            ..Default::default()
        },
    };

    Ok(toml::to_string_pretty(&config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.connection.subprotocol, DEFAULT_SUBPROTOCOL);
        assert_eq!(config.network(), NetworkConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let mut config = Config::default();
        config.connection.subprotocol = "v1".to_string();
        let file = NamedTempFile::new().unwrap();

        config.save(file.path()).unwrap();

        let loaded = Config::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let parsed: Config = toml::from_str("[connection]\nendpoint = \"ws://10.0.0.2:8080/ws\"\n").unwrap();
        assert_eq!(parsed.connection.endpoint, "ws://10.0.0.2:8080/ws");
        assert_eq!(parsed.connection.subprotocol, DEFAULT_SUBPROTOCOL);
        assert!(!parsed.general.verbose);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/axiomwire.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_sample_config() {
        let sample = generate_sample_config().unwrap();
        let parsed: Config = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.connection.endpoint, "wss://game.example.com/ws");
    }
}
