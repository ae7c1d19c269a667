//! The cached metric read path.
//!
//! Composes the pieces every caller needs: a memoizing fetcher keyed by which
//! filters are present, the concurrent aggregator as its producer, and
//! (optionally) the async persister as its miss hook.

use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::aggregator::{AggregatorConfig, ConcurrentAggregator};
use super::cache_key::{filter_presence_key, CacheKeyBuilder, KeyParams, PRIMARY_PARAM, SECONDARY_PARAM};
use super::memoizing_fetcher::{FetchStats, Fetched, MemoizingFetcher};
use super::persister::AsyncPersister;
use super::typed_cache::TypedCache;
use crate::domain::errors::MetricResult;
use crate::domain::models::{AggregationRequest, Config, PartitionId, ResultRecord};
use crate::domain::ports::PartitionSource;

/// Cache operation name for aggregated results.
pub const METRICS_OPERATION: &str = "partition_metrics";

/// Cache operation name for the resolved partition list.
pub const PARTITIONS_OPERATION: &str = "partition_ids";

#[derive(Debug, Clone)]
pub struct MetricServiceConfig {
    pub namespace: String,
    pub result_ttl: Duration,
    pub partition_list_ttl: Duration,
    pub aggregator: AggregatorConfig,
}

impl Default for MetricServiceConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for MetricServiceConfig {
    fn from(config: &Config) -> Self {
        Self {
            namespace: config.cache.namespace.clone(),
            result_ttl: config.cache.default_ttl(),
            partition_list_ttl: config.cache.partition_list_ttl(),
            aggregator: AggregatorConfig::from(&config.aggregator),
        }
    }
}

/// Counters for both key spaces the service owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub results: FetchStats,
    pub partition_list: FetchStats,
}

pub struct MetricService {
    metrics: MemoizingFetcher<Vec<ResultRecord>>,
    aggregator: ConcurrentAggregator,
}

impl MetricService {
    pub fn new(
        cache: Arc<TypedCache>,
        source: Arc<dyn PartitionSource>,
        config: &MetricServiceConfig,
    ) -> Self {
        let partition_list = MemoizingFetcher::new(
            Arc::clone(&cache),
            CacheKeyBuilder::new(&config.namespace, PARTITIONS_OPERATION),
        )
        .with_ttl(config.partition_list_ttl);

        let metrics = MemoizingFetcher::new(
            cache,
            CacheKeyBuilder::new(&config.namespace, METRICS_OPERATION).with_policy(filter_presence_key),
        )
        .with_ttl(config.result_ttl);

        Self {
            metrics,
            aggregator: ConcurrentAggregator::new(source, partition_list, &config.aggregator),
        }
    }

    /// Persist every freshly computed result in the background.
    #[must_use]
    pub fn with_persister(mut self, persister: AsyncPersister) -> Self {
        self.metrics = self.metrics.with_miss_hook(Arc::new(persister));
        self
    }

    /// Records for one partition (or all when `None`), optionally narrowed
    /// to one secondary key.
    pub async fn fetch(
        &self,
        primary: Option<PartitionId>,
        secondary: Option<&str>,
    ) -> MetricResult<Fetched<Vec<ResultRecord>>> {
        let mut request = primary.map_or_else(AggregationRequest::all, AggregationRequest::partition);
        if let Some(secondary) = secondary {
            request = request.with_secondary(secondary);
        }
        self.fetch_request(&request).await
    }

    #[instrument(skip(self), fields(partitions = request.partitions.len()))]
    pub async fn fetch_request(
        &self,
        request: &AggregationRequest,
    ) -> MetricResult<Fetched<Vec<ResultRecord>>> {
        let params = key_params(request);
        let secondary = request.secondary.as_deref();

        self.metrics
            .fetch(&params, || self.aggregator.run(&request.partitions, secondary))
            .await
    }

    /// Every partition the source knows about, cached with the long TTL.
    pub async fn partitions(&self) -> MetricResult<Vec<PartitionId>> {
        self.aggregator.resolve_all_partitions().await
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            results: self.metrics.stats(),
            partition_list: self.aggregator.partition_list_stats(),
        }
    }

    /// The cache key a request is stored under.
    pub fn key_for(&self, request: &AggregationRequest) -> String {
        self.metrics.key_for(&key_params(request))
    }
}

/// Requests for the same partition set share a key regardless of order or
/// duplicates.
fn key_params(request: &AggregationRequest) -> KeyParams {
    let primary = if request.partitions.is_empty() {
        None
    } else {
        let mut partitions = request.partitions.clone();
        partitions.sort_unstable();
        partitions.dedup();
        Some(
            partitions
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        )
    };

    KeyParams::new()
        .named_opt(PRIMARY_PARAM, primary)
        .named_opt(SECONDARY_PARAM, request.secondary.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_params_normalize_partition_order() {
        let a = key_params(&AggregationRequest::partitions([3, 1, 3]));
        let b = key_params(&AggregationRequest::partitions([1, 3]));
        assert_eq!(a, b);
        assert_eq!(a.get(PRIMARY_PARAM), Some("1,3"));
        assert_eq!(a.get(SECONDARY_PARAM), None);
    }

    #[test]
    fn test_key_params_for_all_partitions() {
        let params = key_params(&AggregationRequest::all().with_secondary("hk"));
        assert_eq!(params.get(PRIMARY_PARAM), None);
        assert_eq!(params.get(SECONDARY_PARAM), Some("hk"));
    }

    #[test]
    fn test_config_from_app_config() {
        let config = MetricServiceConfig::default();
        assert_eq!(config.namespace, "metrics");
        assert_eq!(config.result_ttl, Duration::from_secs(120));
        assert_eq!(config.partition_list_ttl, Duration::from_secs(3600));
        assert_eq!(config.aggregator.max_concurrency, 10);
    }
}
