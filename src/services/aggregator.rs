//! Bounded fan-out of partition queries.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::instrument;

use super::cache_key::KeyParams;
use super::memoizing_fetcher::{FetchStats, MemoizingFetcher};
use crate::domain::errors::{MetricError, MetricResult};
use crate::domain::models::{AggregatorSettings, PartitionId, ResultRecord};
use crate::domain::ports::PartitionSource;

/// Default ceiling on in-flight partition queries.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Configuration for the aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Maximum partition queries in flight at once.
    pub max_concurrency: usize,
    /// Deadline for a whole run. Outstanding queries are cancelled on expiry.
    pub query_timeout: Option<Duration>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            query_timeout: None,
        }
    }
}

impl From<&AggregatorSettings> for AggregatorConfig {
    fn from(settings: &AggregatorSettings) -> Self {
        Self {
            max_concurrency: settings.max_concurrency,
            query_timeout: settings.query_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Queries many partitions concurrently and merges their records.
///
/// The semaphore is created once and shared by every run, so the ceiling
/// holds across concurrent requests, not just within one. Admission is
/// first-come-first-served.
///
/// A single failing partition fails the whole run; no partial list is
/// returned.
pub struct ConcurrentAggregator {
    source: Arc<dyn PartitionSource>,
    limiter: Arc<Semaphore>,
    partition_list: MemoizingFetcher<Vec<PartitionId>>,
    query_timeout: Option<Duration>,
}

impl ConcurrentAggregator {
    /// Create an aggregator.
    ///
    /// `partition_list` caches the "all partitions" lookup and should carry a
    /// long TTL.
    pub fn new(
        source: Arc<dyn PartitionSource>,
        partition_list: MemoizingFetcher<Vec<PartitionId>>,
        config: &AggregatorConfig,
    ) -> Self {
        Self {
            source,
            limiter: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            partition_list,
            query_timeout: config.query_timeout,
        }
    }

    /// Share an existing limiter instead of owning one.
    #[must_use]
    pub fn with_limiter(mut self, limiter: Arc<Semaphore>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Hit/miss counters of the partition list cache.
    pub fn partition_list_stats(&self) -> FetchStats {
        self.partition_list.stats()
    }

    /// Query `partitions` (all known partitions when empty) and keep only
    /// records whose secondary key equals `secondary`, if given.
    ///
    /// Record order is unspecified.
    #[instrument(skip(self), fields(requested = partitions.len()))]
    pub async fn run(
        &self,
        partitions: &[PartitionId],
        secondary: Option<&str>,
    ) -> MetricResult<Vec<ResultRecord>> {
        let targets = if partitions.is_empty() {
            self.resolve_all_partitions().await?
        } else {
            dedup_preserving_order(partitions)
        };

        let fan_out = self.fan_out(targets, secondary.map(str::to_owned));
        let mut records = match self.query_timeout {
            Some(limit) => timeout(limit, fan_out)
                .await
                .map_err(|_| MetricError::AggregationTimedOut { after: limit })??,
            None => fan_out.await?,
        };

        if let Some(filter) = secondary {
            records.retain(|record| record.secondary_key == filter);
        }

        tracing::debug!(records = records.len(), "aggregation complete");
        Ok(records)
    }

    /// The full partition set, served from the long-lived partition list cache.
    pub async fn resolve_all_partitions(&self) -> MetricResult<Vec<PartitionId>> {
        let source = Arc::clone(&self.source);
        let fetched = self
            .partition_list
            .fetch(&KeyParams::new(), || async move {
                source
                    .list_partitions()
                    .await
                    .map_err(|e| MetricError::PartitionListingFailed(e.to_string()))
            })
            .await?;
        Ok(fetched.value)
    }

    /// Spawn one query per partition and wait for all of them.
    ///
    /// Returning early drops the `JoinSet`, which aborts every query still
    /// waiting or running.
    async fn fan_out(
        &self,
        partitions: Vec<PartitionId>,
        secondary: Option<String>,
    ) -> MetricResult<Vec<ResultRecord>> {
        let mut queries = JoinSet::new();

        for partition in partitions {
            let source = Arc::clone(&self.source);
            let limiter = Arc::clone(&self.limiter);
            let secondary = secondary.clone();

            queries.spawn(async move {
                let _permit = limiter
                    .acquire_owned()
                    .await
                    .map_err(|_| MetricError::TaskFailed("fan-out limiter closed".to_string()))?;
                query_partition(source.as_ref(), partition, secondary.as_deref()).await
            });
        }

        let mut records = Vec::new();
        while let Some(joined) = queries.join_next().await {
            let batch = joined.map_err(|e| MetricError::TaskFailed(e.to_string()))??;
            records.extend(batch);
        }
        Ok(records)
    }
}

async fn query_partition(
    source: &dyn PartitionSource,
    partition: PartitionId,
    secondary: Option<&str>,
) -> MetricResult<Vec<ResultRecord>> {
    let entries = source
        .query_partition(partition, secondary)
        .await
        .map_err(|e| {
            tracing::error!(partition, error = %e, "partition query failed");
            MetricError::UpstreamQueryFailed {
                partition,
                message: e.to_string(),
            }
        })?;

    Ok(entries
        .into_iter()
        .map(|entry| ResultRecord::new(partition, entry.secondary_key, entry.value))
        .collect())
}

fn dedup_preserving_order(partitions: &[PartitionId]) -> Vec<PartitionId> {
    let mut seen = HashSet::with_capacity(partitions.len());
    partitions
        .iter()
        .copied()
        .filter(|partition| seen.insert(*partition))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        assert_eq!(dedup_preserving_order(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = AggregatorSettings {
            max_concurrency: 4,
            query_timeout_secs: Some(30),
        };
        let config = AggregatorConfig::from(&settings);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.query_timeout, Some(Duration::from_secs(30)));
    }
}
