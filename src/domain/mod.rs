//! Domain layer for the metric cache
//!
//! This module contains the record types, the cache shape descriptor and the
//! port traits that adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{CacheError, MetricError, MetricResult, SourceError};
