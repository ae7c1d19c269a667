use async_trait::async_trait;

use crate::domain::errors::MetricResult;
use crate::domain::models::{PartitionId, PersistedRecord, ResultRecord};

/// Durable storage for computed metric records
#[async_trait]
pub trait MetricRepository: Send + Sync {
    /// Insert one record; the store assigns `id` and timestamps
    ///
    /// Single-record and independent: no multi-record transaction is used.
    async fn create_record(&self, record: &ResultRecord) -> MetricResult<PersistedRecord>;

    /// List persisted records, newest first
    ///
    /// # Arguments
    /// * `partition` - Optional partition filter
    /// * `limit` - Maximum number of rows
    async fn list_records(
        &self,
        partition: Option<PartitionId>,
        limit: u32,
    ) -> MetricResult<Vec<PersistedRecord>>;

    /// Total number of persisted records
    async fn count(&self) -> MetricResult<u64>;
}
