//! Per-partition metric records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shape::{Shape, Shaped};

/// Identifier of an independently queryable partition of the upstream ledger.
pub type PartitionId = u32;

/// One `(secondary_key, value)` pair as returned by a single partition query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionEntry {
    pub secondary_key: String,
    pub value: i64,
}

impl PartitionEntry {
    pub fn new(secondary_key: impl Into<String>, value: i64) -> Self {
        Self {
            secondary_key: secondary_key.into(),
            value,
        }
    }
}

/// A metric value for one secondary key within one partition.
///
/// Produced by an aggregation run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultRecord {
    pub partition_id: PartitionId,
    pub secondary_key: String,
    pub value: i64,
}

impl ResultRecord {
    pub fn new(partition_id: PartitionId, secondary_key: impl Into<String>, value: i64) -> Self {
        Self {
            partition_id,
            secondary_key: secondary_key.into(),
            value,
        }
    }
}

impl Shaped for ResultRecord {
    fn shape() -> Shape {
        Shape::record(
            "ResultRecord",
            [
                ("partition_id", Shape::Int),
                ("secondary_key", Shape::Str),
                ("value", Shape::Int),
            ],
        )
    }
}

/// Durable counterpart of a [`ResultRecord`]; `id` is assigned by the store.
///
/// Only cache misses are persisted, so there is no `cached` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub id: i64,
    pub partition_id: PartitionId,
    pub secondary_key: String,
    pub value: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a caller asks the read path for.
///
/// An empty `partitions` list means every partition the source knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationRequest {
    pub partitions: Vec<PartitionId>,
    pub secondary: Option<String>,
}

impl AggregationRequest {
    /// Every known partition, no secondary filter.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn partition(partition: PartitionId) -> Self {
        Self {
            partitions: vec![partition],
            secondary: None,
        }
    }

    pub fn partitions(partitions: impl IntoIterator<Item = PartitionId>) -> Self {
        Self {
            partitions: partitions.into_iter().collect(),
            secondary: None,
        }
    }

    #[must_use]
    pub fn with_secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary = Some(secondary.into());
        self
    }
}
