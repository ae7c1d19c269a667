//! Domain errors for the metric cache.

use std::time::Duration;
use thiserror::Error;

use super::models::PartitionId;

/// Errors raised by the typed cache and its backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store could not be reached. Fetchers degrade this to a miss;
    /// the raw cache always reports it.
    #[error("Cache backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The stored payload cannot be rebuilt into the requested shape.
    #[error("Cached value at `{path}` does not match requested shape: expected {expected}, found {found}")]
    SerializationMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Failed to encode value for caching: {0}")]
    Encoding(String),
}

/// Errors reported by a partition data source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Partition source unreachable: {0}")]
    Unreachable(String),

    #[error("Unknown partition: {0}")]
    UnknownPartition(PartitionId),

    #[error("Malformed partition data: {0}")]
    Malformed(String),
}

/// Errors surfaced by the read path.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("Upstream query for partition {partition} failed: {message}")]
    UpstreamQueryFailed {
        partition: PartitionId,
        message: String,
    },

    #[error("Listing partitions failed: {0}")]
    PartitionListingFailed(String),

    #[error("Aggregation timed out after {after:?}")]
    AggregationTimedOut { after: Duration },

    #[error("Persisting {secondary_key} for partition {partition} failed: {message}")]
    PersistenceFailed {
        partition: PartitionId,
        secondary_key: String,
        message: String,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl MetricError {
    /// Whether a caller at the request boundary may retry the same request.
    ///
    /// Upstream failures and timeouts are transient; a shape mismatch is a
    /// contract violation and retrying will not help.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamQueryFailed { .. }
                | Self::PartitionListingFailed(_)
                | Self::AggregationTimedOut { .. }
                | Self::TaskFailed(_)
                | Self::Cache(CacheError::BackendUnavailable(_))
        )
    }
}

pub type MetricResult<T> = Result<T, MetricError>;

impl From<sqlx::Error> for MetricError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for MetricError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let upstream = MetricError::UpstreamQueryFailed {
            partition: 3,
            message: "connection reset".to_string(),
        };
        assert!(upstream.is_retryable());

        let timeout = MetricError::AggregationTimedOut {
            after: Duration::from_secs(5),
        };
        assert!(timeout.is_retryable());

        let mismatch = MetricError::Cache(CacheError::SerializationMismatch {
            path: "$[0]".to_string(),
            expected: "integer".to_string(),
            found: "string".to_string(),
        });
        assert!(!mismatch.is_retryable());
    }

    #[test]
    fn test_upstream_error_names_partition() {
        let err = MetricError::UpstreamQueryFailed {
            partition: 18,
            message: "timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Upstream query for partition 18 failed: timeout"
        );
    }
}
