use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest TTL a cache entry may be given (one year).
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Main configuration structure for metric-cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Cache backend and TTL configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Partition fan-out configuration
    #[serde(default)]
    pub aggregator: AggregatorSettings,

    /// Durable store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which cache backend to connect at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// In-process map, lost on restart
    #[default]
    Memory,
    /// Shared Redis instance
    Redis,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackendKind,

    /// Redis connection URL, used when `backend` is `redis`
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Prefix for every cache key
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// TTL for aggregated metric results
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// TTL for the resolved partition list, which changes far less often
    #[serde(default = "default_partition_list_ttl_secs")]
    pub partition_list_ttl_secs: u64,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_namespace() -> String {
    "metrics".to_string()
}

const fn default_ttl_secs() -> u64 {
    120
}

const fn default_partition_list_ttl_secs() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::default(),
            redis_url: default_redis_url(),
            namespace: default_namespace(),
            default_ttl_secs: default_ttl_secs(),
            partition_list_ttl_secs: default_partition_list_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub const fn partition_list_ttl(&self) -> Duration {
        Duration::from_secs(self.partition_list_ttl_secs)
    }
}

/// Partition fan-out configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AggregatorSettings {
    /// Maximum partition queries in flight at once (1-100)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Deadline for a whole aggregation run; unbounded when absent
    #[serde(default)]
    pub query_timeout_secs: Option<u64>,
}

const fn default_max_concurrency() -> usize {
    10
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            query_timeout_secs: None,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".metric-cache/metrics.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when absent
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
