//! metric-cache - typed cache-aside reads over a slow partitioned ledger
//!
//! Per-partition metrics are expensive to compute: every request fans out
//! one query per partition to an upstream source. This crate puts a typed
//! cache in front of that fan-out, bounds its concurrency, and persists
//! freshly computed results in the background.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, the `Shape` descriptor, errors and port traits
//! - **Service Layer** (`services`): typed cache, key builder, memoizing fetcher,
//!   concurrent aggregator, async persister, and the composed `MetricService`
//! - **Adapters** (`adapters`): memory and Redis cache backends, partition
//!   sources, `SQLite` store
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use metric_cache::adapters::cache::MemoryCacheBackend;
//! use metric_cache::adapters::sources::SnapshotPartitionSource;
//! use metric_cache::services::{MetricService, MetricServiceConfig, TypedCache};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = Arc::new(TypedCache::new(
//!         Arc::new(MemoryCacheBackend::new()),
//!         Duration::from_secs(120),
//!     ));
//!     let source = Arc::new(SnapshotPartitionSource::from_path("ledger.yaml").await?);
//!     let service = MetricService::new(cache, source, &MetricServiceConfig::default());
//!
//!     let fetched = service.fetch(Some(18), None).await?;
//!     println!("{} records, cached: {}", fetched.value.len(), fetched.cached);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{CacheError, MetricError, MetricResult, SourceError};
pub use domain::models::{
    AggregationRequest, Config, PartitionEntry, PartitionId, PersistedRecord, ResultRecord, Shape,
    Shaped,
};
pub use domain::ports::{CacheBackend, MetricRepository, PartitionSource};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    AsyncPersister, CacheKeyBuilder, ConcurrentAggregator, Fetched, KeyParams, MemoizingFetcher,
    MetricService, TypedCache,
};
