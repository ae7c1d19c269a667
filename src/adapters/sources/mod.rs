//! Partition sources.

pub mod mock;
pub mod snapshot;

pub use mock::MockPartitionSource;
pub use snapshot::SnapshotPartitionSource;
