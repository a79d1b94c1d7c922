// Configuration
//
// *La Configuration* (The Configuration) - Settings for the suggester, its store and server

use crate::suggest::{DEFAULT_MAX_RESULTS, MAX_RESULTS_LIMIT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = ".lesuggestion/config.toml";

/// Default database path, relative to the working directory
pub const DEFAULT_DB_PATH: &str = ".lesuggestion/store.db";

/// Default port for the HTTP MCP server
pub const DEFAULT_PORT: u16 = 47269;

/// Environment variable overriding the server port
pub const PORT_ENV_VAR: &str = "LESUGGESTION_PORT";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Ranking settings
    pub suggest: SuggestConfig,

    /// Document store settings
    pub store: StoreConfig,

    /// MCP server settings
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from `path`, or from [`DEFAULT_CONFIG_FILE`]
    ///
    /// A missing file yields the default configuration. The loaded values
    /// are validated before being returned.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if !config_path.exists() {
            if path.is_some() {
                return Err(ConfigError::Invalid(format!(
                    "Config file not found: {}",
                    config_path.display()
                )));
            }
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config = Self::from_toml(&content)?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml_string =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialization(e.to_string()))?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = self.suggest.default_max_results;
        if !(1..=MAX_RESULTS_LIMIT).contains(&max) {
            return Err(ConfigError::Invalid(format!(
                "suggest.default_max_results must be between 1 and {}, got {}",
                MAX_RESULTS_LIMIT, max
            )));
        }
        if self.suggest.search_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "suggest.search_timeout_ms must be positive; omit it to disable the timeout"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Ranking settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuggestConfig {
    /// Results returned when a request gives no maximum
    pub default_max_results: usize,

    /// Per-library search budget in milliseconds
    pub search_timeout_ms: Option<u64>,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            default_max_results: DEFAULT_MAX_RESULTS,
            search_timeout_ms: None,
        }
    }
}

impl SuggestConfig {
    /// Per-library search timeout, if configured
    pub fn search_timeout(&self) -> Option<Duration> {
        self.search_timeout_ms.map(Duration::from_millis)
    }
}

/// Document store settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

/// MCP HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Port after applying the [`PORT_ENV_VAR`] override
    pub fn effective_port(&self) -> u16 {
        std::env::var(PORT_ENV_VAR)
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(self.port)
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Input/Output error during configuration file handling
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize configuration to TOML
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Failed to parse configuration from file
    #[error("Parse error: {0}")]
    Parse(String),

    /// The configuration contains invalid values or settings
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
