use async_trait::async_trait;
use std::time::Duration;

use crate::domain::errors::CacheError;

/// Byte-level key/value store with per-entry TTL.
///
/// Implementations own expiry; the typed cache never removes entries itself.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Read the raw payload stored under `key`
    ///
    /// # Returns
    /// * `Ok(Some(bytes))` if present and not expired
    /// * `Ok(None)` if absent or expired
    /// * `Err(CacheError::BackendUnavailable)` if the store cannot be reached
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key`, expiring after `ttl`
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}
