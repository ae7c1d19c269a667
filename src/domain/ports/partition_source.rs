use async_trait::async_trait;

use crate::domain::errors::SourceError;
use crate::domain::models::{PartitionEntry, PartitionId};

/// The upstream data source, queried one partition at a time.
///
/// Treated as slow and unreliable. The aggregator is its only caller.
#[async_trait]
pub trait PartitionSource: Send + Sync {
    /// List every partition the source currently knows about
    async fn list_partitions(&self) -> Result<Vec<PartitionId>, SourceError>;

    /// Query one partition, optionally narrowed to a single secondary key
    ///
    /// Sources may ignore `secondary`; the aggregator filters again after
    /// collecting results.
    async fn query_partition(
        &self,
        partition: PartitionId,
        secondary: Option<&str>,
    ) -> Result<Vec<PartitionEntry>, SourceError>;
}
