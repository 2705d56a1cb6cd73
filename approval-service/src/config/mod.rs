//! Configuration module for approval-service.

use service_core::config::{self as core_config, env_or, env_required, env_string};
use service_core::error::AppError;
use std::env;
use std::time::Duration;

use crate::workflow::ResolverSettings;

#[derive(Debug, Clone)]
pub struct ApprovalConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub resolver: ResolverSettings,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl ApprovalConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let defaults = ResolverSettings::default();

        Ok(Self {
            common,
            service_name: env_string("SERVICE_NAME", "approval-service"),
            service_version: env_string("SERVICE_VERSION", env!("CARGO_PKG_VERSION")),
            log_level: env_string("LOG_LEVEL", "info"),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: env_required("DATABASE_URL")?,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", 2),
            },
            cache: CacheConfig {
                ttl_secs: env_or("CONFIG_CACHE_TTL_SECS", 300),
            },
            resolver: ResolverSettings {
                regional_ict_designation: env_string(
                    "REGIONAL_ICT_DESIGNATION",
                    &defaults.regional_ict_designation,
                ),
                field_systems_designation: env_string(
                    "FIELD_SYSTEMS_DESIGNATION",
                    &defaults.field_systems_designation,
                ),
                regional_designation: env_string(
                    "REGIONAL_DESIGNATION",
                    &defaults.regional_designation,
                ),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn from_env_applies_defaults() {
        env::set_var("DATABASE_URL", "postgres://localhost/approvals");
        env::remove_var("CONFIG_CACHE_TTL_SECS");
        env::remove_var("REGIONAL_DESIGNATION");
        let config = ApprovalConfig::from_env().unwrap();
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.resolver.regional_designation, "Regional Manager");
    }

    #[test]
    #[serial]
    fn from_env_requires_database_url() {
        env::remove_var("DATABASE_URL");
        let err = ApprovalConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    #[serial]
    fn from_env_reads_resolver_designations() {
        env::set_var("DATABASE_URL", "postgres://localhost/approvals");
        env::set_var("FIELD_SYSTEMS_DESIGNATION", "Systems Officer");
        env::set_var("CONFIG_CACHE_TTL_SECS", "15");
        let config = ApprovalConfig::from_env().unwrap();
        assert_eq!(config.resolver.field_systems_designation, "Systems Officer");
        assert_eq!(config.cache.ttl_secs, 15);
        env::remove_var("FIELD_SYSTEMS_DESIGNATION");
        env::remove_var("CONFIG_CACHE_TTL_SECS");
    }
}
