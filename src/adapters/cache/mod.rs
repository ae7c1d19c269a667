//! Cache backends for the typed cache.
//!
//! The memory backend serves tests and single-process deployments; the Redis
//! backend is shared across processes.

pub mod memory;
pub mod redis_store;

pub use memory::MemoryCacheBackend;
pub use redis_store::RedisCacheBackend;
