//! Common test utilities for integration tests
//!
//! Shared fixtures for building a read path over in-memory adapters.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metric_cache::adapters::cache::MemoryCacheBackend;
use metric_cache::adapters::sources::MockPartitionSource;
use metric_cache::domain::models::{PartitionId, PersistedRecord, ResultRecord};
use metric_cache::services::{MetricService, MetricServiceConfig, TypedCache};
use metric_cache::{MetricError, MetricRepository, MetricResult};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// The two-partition ledger used throughout: `1 -> [A=10]`, `2 -> [B=20]`.
pub fn two_partition_source() -> MockPartitionSource {
    MockPartitionSource::new()
        .with_partition(1, [("A", 10)])
        .with_partition(2, [("B", 20)])
}

/// A read path plus handles to its cache backend, typed cache and source.
pub struct Harness {
    pub backend: Arc<MemoryCacheBackend>,
    pub cache: Arc<TypedCache>,
    pub source: Arc<MockPartitionSource>,
    pub service: MetricService,
}

pub fn harness(source: MockPartitionSource, config: &MetricServiceConfig) -> Harness {
    let backend = Arc::new(MemoryCacheBackend::new());
    let cache = Arc::new(TypedCache::new(backend.clone(), config.result_ttl));
    let source = Arc::new(source);
    let service = MetricService::new(cache.clone(), source.clone(), config);
    Harness {
        backend,
        cache,
        source,
        service,
    }
}

pub fn config_with_ttl(ttl: Duration) -> MetricServiceConfig {
    MetricServiceConfig {
        result_ttl: ttl,
        ..MetricServiceConfig::default()
    }
}

/// Sort records so unordered aggregation output can be compared.
pub fn sorted(mut records: Vec<ResultRecord>) -> Vec<ResultRecord> {
    records.sort();
    records
}

/// In-memory repository, optionally failing every write.
#[derive(Default)]
pub struct InMemoryRepository {
    pub fail_writes: bool,
    pub stored: Mutex<Vec<ResultRecord>>,
    pub attempts: AtomicUsize,
}

impl InMemoryRepository {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricRepository for InMemoryRepository {
    async fn create_record(&self, record: &ResultRecord) -> MetricResult<PersistedRecord> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(MetricError::DatabaseError("disk full".to_string()));
        }
        let mut stored = self.stored.lock().unwrap();
        stored.push(record.clone());
        let now = Utc::now();
        Ok(PersistedRecord {
            id: stored.len() as i64,
            partition_id: record.partition_id,
            secondary_key: record.secondary_key.clone(),
            value: record.value,
            created_at: now,
            updated_at: now,
        })
    }

    async fn list_records(
        &self,
        _partition: Option<PartitionId>,
        _limit: u32,
    ) -> MetricResult<Vec<PersistedRecord>> {
        Ok(Vec::new())
    }

    async fn count(&self) -> MetricResult<u64> {
        Ok(self.stored.lock().unwrap().len() as u64)
    }
}
