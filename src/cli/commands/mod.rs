//! CLI command implementations.

pub mod fetch;
pub mod partitions;
pub mod records;
