//! The cache-aside read path.

pub mod aggregator;
pub mod cache_key;
pub mod memoizing_fetcher;
pub mod metric_service;
pub mod persister;
pub mod typed_cache;

pub use aggregator::{AggregatorConfig, ConcurrentAggregator, DEFAULT_MAX_CONCURRENCY};
pub use cache_key::{
    build_key, filter_presence_key, CacheKeyBuilder, KeyParams, KeyPolicy, PRIMARY_PARAM,
    SECONDARY_PARAM,
};
pub use memoizing_fetcher::{FetchStats, Fetched, MemoizingFetcher, MissHook};
pub use metric_service::{MetricService, MetricServiceConfig, ServiceStats};
pub use persister::{AsyncPersister, PersistenceHandle, PersistenceReport};
pub use typed_cache::{TypedCache, MAX_TTL, MIN_TTL};
