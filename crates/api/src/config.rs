//! Server Configuration
//!
//! Layered as defaults, then an optional `sensor-dashboard.{toml,yaml,json}`
//! file (or an explicit path), then `SENSOR_DASHBOARD_*` environment variables.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid bind address {addr}: {source}")]
    BindAddr {
        addr: String,
        source: std::net::AddrParseError,
    },
    #[error("recent_limit must be at least 1")]
    ZeroLimit,
    #[error("Unknown log level: {0}")]
    LogLevel(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,
    /// sqlx SQLite URL
    pub database_url: String,
    /// Readings returned by `GET /data`
    pub recent_limit: u32,
    /// Max tracing level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Install the Prometheus recorder and serve `/metrics`
    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            database_url: "sqlite://sensor_data.db".to_string(),
            recent_limit: 20,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
        }
    }
}

impl ServerConfig {
    pub const ENV_PREFIX: &'static str = "SENSOR_DASHBOARD";
    pub const DEFAULT_FILE: &'static str = "sensor-dashboard";

    /// Load configuration. Without `path`, a `sensor-dashboard.*` file in the
    /// working directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path),
            None => File::with_name(Self::DEFAULT_FILE).required(false),
        };

        let env = Environment::with_prefix(Self::ENV_PREFIX).try_parsing(true);
        let config: ServerConfig = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recent_limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        self.socket_addr()?;
        self.level()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|source| ConfigError::BindAddr {
                addr: self.bind_addr.clone(),
                source,
            })
    }

    pub fn level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }
}
