//! Instrumented in-memory partition source for tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::errors::SourceError;
use crate::domain::models::{PartitionEntry, PartitionId};
use crate::domain::ports::PartitionSource;

/// Mock source that records how it is called.
///
/// Tracks the number of queries in flight (and the peak), total query and
/// listing calls, and can be told to fail specific partitions or to hold
/// every query for a fixed delay.
#[derive(Debug, Default)]
pub struct MockPartitionSource {
    partitions: RwLock<BTreeMap<PartitionId, Vec<PartitionEntry>>>,
    failing: RwLock<HashSet<PartitionId>>,
    fail_listing: AtomicBool,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    query_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl MockPartitionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every partition query for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_partition(
        mut self,
        partition: PartitionId,
        entries: impl IntoIterator<Item = (&'static str, i64)>,
    ) -> Self {
        let entries = entries
            .into_iter()
            .map(|(key, value)| PartitionEntry::new(key, value))
            .collect();
        self.partitions.get_mut().insert(partition, entries);
        self
    }

    pub async fn set_partition(&self, partition: PartitionId, entries: Vec<PartitionEntry>) {
        self.partitions.write().await.insert(partition, entries);
    }

    /// Make every query for `partition` fail with `Unreachable`.
    pub async fn fail_partition(&self, partition: PartitionId) {
        self.failing.write().await.insert(partition);
    }

    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight gauge even when the query future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PartitionSource for MockPartitionSource {
    async fn list_partitions(&self) -> Result<Vec<PartitionId>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(SourceError::Unreachable("partition listing disabled".to_string()));
        }
        Ok(self.partitions.read().await.keys().copied().collect())
    }

    async fn query_partition(
        &self,
        partition: PartitionId,
        secondary: Option<&str>,
    ) -> Result<Vec<PartitionEntry>, SourceError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.read().await.contains(&partition) {
            return Err(SourceError::Unreachable(format!("partition {partition} offline")));
        }

        let partitions = self.partitions.read().await;
        let entries = partitions
            .get(&partition)
            .ok_or(SourceError::UnknownPartition(partition))?;

        Ok(entries
            .iter()
            .filter(|entry| secondary.map_or(true, |key| entry.secondary_key == key))
            .cloned()
            .collect())
    }
}
