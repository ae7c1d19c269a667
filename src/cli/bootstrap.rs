//! Wiring shared by the commands: cache backend, read path and store.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

use crate::adapters::cache::{MemoryCacheBackend, RedisCacheBackend};
use crate::adapters::sources::SnapshotPartitionSource;
use crate::adapters::sqlite::initialize_database;
use crate::domain::models::{CacheBackendKind, CacheConfig, Config};
use crate::domain::ports::CacheBackend;
use crate::services::{MetricService, MetricServiceConfig, TypedCache};

/// Connect the configured cache backend.
pub async fn connect_cache(config: &CacheConfig) -> Result<Arc<TypedCache>> {
    let backend: Arc<dyn CacheBackend> = match config.backend {
        CacheBackendKind::Memory => Arc::new(MemoryCacheBackend::new()),
        CacheBackendKind::Redis => Arc::new(
            RedisCacheBackend::connect(&config.redis_url)
                .await
                .with_context(|| format!("Failed to connect to cache at {}", config.redis_url))?,
        ),
    };
    Ok(Arc::new(TypedCache::new(backend, config.default_ttl())))
}

/// Build the read path over a snapshot file. No persister is attached.
pub async fn metric_service(config: &Config, snapshot: &Path) -> Result<MetricService> {
    let source = SnapshotPartitionSource::from_path(snapshot)
        .await
        .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?;
    let cache = connect_cache(&config.cache).await?;
    Ok(MetricService::new(
        cache,
        Arc::new(source),
        &MetricServiceConfig::from(config),
    ))
}

pub async fn open_database(config: &Config) -> Result<SqlitePool> {
    initialize_database(&config.database)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.path))
}
