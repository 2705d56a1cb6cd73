use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::str::FromStr;

/// Settings shared by every service binary.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_port() -> u16 {
    8080
}

fn default_environment() -> String {
    "development".to_string()
}

impl Config {
    /// Load from `configuration.{toml,yaml,json}` (optional) overlaid by `APP__*` variables.
    pub fn load() -> Result<Self, AppError> {
        Self::load_from("configuration")
    }

    pub fn load_from(file_stem: &str) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name(file_stem).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Read an environment variable and parse it, falling back to `default` when the
/// variable is unset or does not parse.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Read a string environment variable with a default.
pub fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a required environment variable.
pub fn env_required(key: &str) -> Result<String, AppError> {
    std::env::var(key)
        .map_err(|_| AppError::ConfigError(anyhow::anyhow!("{} is required", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_missing_and_unparseable() {
        assert_eq!(env_or("SERVICE_CORE_TEST_MISSING_KEY", 7u32), 7);
        // SAFETY: test-local variable name, not read elsewhere.
        unsafe { std::env::set_var("SERVICE_CORE_TEST_BAD_NUMBER", "seven") };
        assert_eq!(env_or("SERVICE_CORE_TEST_BAD_NUMBER", 3u32), 3);
    }

    #[test]
    fn env_required_reports_the_key() {
        let err = env_required("SERVICE_CORE_TEST_REQUIRED_KEY").unwrap_err();
        assert!(err.to_string().contains("SERVICE_CORE_TEST_REQUIRED_KEY"));
    }
}
