//! Adapters for the cache, the upstream source and the durable store.

pub mod cache;
pub mod sources;
pub mod sqlite;
