//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - CacheBackend: raw key/value storage with TTL
//! - PartitionSource: the slow upstream ledger, queried per partition
//! - MetricRepository: durable storage for computed records
//!
//! These traits keep the read path independent of Redis, SQLite and the
//! upstream transport.

pub mod cache_backend;
pub mod metric_repository;
pub mod partition_source;

pub use cache_backend::CacheBackend;
pub use metric_repository::MetricRepository;
pub use partition_source::PartitionSource;
