use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::{CacheBackendKind, Config, MAX_TTL_SECS};

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".metric-cache";

/// Prefix for environment overrides; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "METRIC_CACHE_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_concurrency: {0}. Must be between 1 and 100")]
    InvalidMaxConcurrency(usize),

    #[error("Invalid query_timeout_secs: must be at least 1")]
    InvalidQueryTimeout,

    #[error("Invalid {field}: must be between 1 second and one year")]
    InvalidTtl { field: &'static str },

    #[error("Cache namespace cannot be empty")]
    EmptyNamespace,

    #[error("Redis URL must start with redis:// or rediss://, got: {0}")]
    InvalidRedisUrl(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .metric-cache/config.yaml
    /// 3. .metric-cache/local.yaml (optional local overrides)
    /// 4. Environment variables (METRIC_CACHE_* prefix)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment(None)
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring environment
    /// overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Self::figment(Some(path))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(file: Option<&Path>) -> Figment {
        let base = Figment::new().merge(Serialized::defaults(Config::default()));
        let with_files = match file {
            Some(path) => base.merge(Yaml::file(path)),
            None => base
                .merge(Yaml::file(Path::new(CONFIG_DIR).join("config.yaml")))
                .merge(Yaml::file(Path::new(CONFIG_DIR).join("local.yaml"))),
        };
        with_files.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let aggregator = &config.aggregator;
        if aggregator.max_concurrency == 0 || aggregator.max_concurrency > 100 {
            return Err(ConfigError::InvalidMaxConcurrency(aggregator.max_concurrency));
        }
        if aggregator.query_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidQueryTimeout);
        }

        let cache = &config.cache;
        if cache.namespace.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        if !(1..=MAX_TTL_SECS).contains(&cache.default_ttl_secs) {
            return Err(ConfigError::InvalidTtl {
                field: "default_ttl_secs",
            });
        }
        if !(1..=MAX_TTL_SECS).contains(&cache.partition_list_ttl_secs) {
            return Err(ConfigError::InvalidTtl {
                field: "partition_list_ttl_secs",
            });
        }
        if cache.backend == CacheBackendKind::Redis
            && !(cache.redis_url.starts_with("redis://") || cache.redis_url.starts_with("rediss://"))
        {
            return Err(ConfigError::InvalidRedisUrl(cache.redis_url.clone()));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
