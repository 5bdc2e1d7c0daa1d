//! Configuration loading for the Fleetrun client.
//!
//! Layered in the usual order: defaults, then an optional config file, then
//! `FLEETRUN_*` environment variables. `dotenvy` is loaded once before the
//! environment layer is read.

use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{FleetrunError, FleetrunResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FleetrunConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Connection parameters for the orchestration backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token. On plain-hyperlink surfaces (artifact download, log
    /// stream) it travels as a query parameter instead of a header.
    #[serde(default)]
    pub token: String,

    /// Ambient project id. When absent the server's implicit default
    /// project applies.
    #[serde(default)]
    pub project_id: Option<i64>,

    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            project_id: None,
            request_timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Per-user config file path (`~/.config/fleetrun/config.toml`), when the
/// platform exposes a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fleetrun").join("config.toml"))
}

impl FleetrunConfig {
    /// Load configuration from the default file location and environment.
    pub fn load() -> FleetrunResult<Self> {
        Self::load_from(default_config_path())
    }

    /// Load configuration, optionally from an explicit file path.
    pub fn load_from(path: Option<PathBuf>) -> FleetrunResult<Self> {
        dotenvy::dotenv().ok();

        let mut builder = ConfigBuilder::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let settings = builder
            .add_source(Environment::with_prefix("FLEETRUN").separator("__"))
            .build()?;

        let config: FleetrunConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> FleetrunResult<()> {
        if self.server.base_url.trim().is_empty() {
            return Err(FleetrunError::MissingConfig("server.base_url".to_string()));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(FleetrunError::Config(
                "server.request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FleetrunConfig::default();
        assert_eq!(config.server.base_url, "http://localhost:8000");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert!(config.server.project_id.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let mut config = FleetrunConfig::default();
        config.server.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_blank_base_url() {
        let mut config = FleetrunConfig::default();
        config.server.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
