use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration file, looked up relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "puzzle-bff.yaml";

/// Prefix for environment overrides, e.g. `PUZZLE_BFF_STORES__REQUEST_TIMEOUT_MS`
pub const ENV_PREFIX: &str = "PUZZLE_BFF_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to extract configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("Store URL for {0} cannot be empty when stores.mode is http")]
    EmptyStoreUrl(&'static str),

    #[error("Invalid request_timeout_ms: {0}. Must be at least 1")]
    InvalidTimeout(u64),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("JWT secret cannot be empty")]
    EmptyJwtSecret,
}

/// Which store implementations back the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    Http,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoresConfig {
    pub mode: StoreMode,
    pub puzzles_url: String,
    pub active_games_url: String,
    pub statistics_url: String,
    pub request_timeout_ms: u64,
}

impl StoresConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            mode: StoreMode::Http,
            puzzles_url: "http://localhost:3000".to_string(),
            active_games_url: "http://localhost:3100".to_string(),
            statistics_url: "http://localhost:3200".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub audience: Option<String>,
    pub issuer: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "your-secret-key-change-in-production".to_string(),
            audience: None,
            issuer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind_address: String,
    pub log_format: String,
    pub stores: StoresConfig,
    pub auth: AuthConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            log_format: "pretty".to_string(),
            stores: StoresConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Precedence (lowest to highest): defaults, `puzzle-bff.yaml`, `PUZZLE_BFF_*` env vars
    pub fn load() -> Result<AppConfig, ConfigError> {
        Self::load_from_file(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Loads configuration from an in-memory YAML document layered over defaults
    pub fn load_from_str(yaml: &str) -> Result<AppConfig, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::string(yaml));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<AppConfig, ConfigError> {
        let config: AppConfig = figment.extract().map_err(Box::new)?;
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
        if config.stores.mode == StoreMode::Http {
            let urls = [
                ("puzzles", &config.stores.puzzles_url),
                ("active games", &config.stores.active_games_url),
                ("statistics", &config.stores.statistics_url),
            ];
            for (name, url) in urls {
                if url.trim().is_empty() {
                    return Err(ConfigError::EmptyStoreUrl(name));
                }
            }
        }

        if config.stores.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(config.stores.request_timeout_ms));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.log_format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.log_format.clone()));
        }

        if config.auth.jwt_secret.is_empty() {
            return Err(ConfigError::EmptyJwtSecret);
        }

        Ok(())
    }
}
