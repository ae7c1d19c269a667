//! In-process cache backend on a moka TTL cache.
//!
//! Every entry carries its own TTL, applied through a moka [`Expiry`] on both
//! insert and overwrite. Expired entries are never returned and are evicted by
//! moka's housekeeping, not only when their key is read again.

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::domain::errors::CacheError;
use crate::domain::models::MAX_TTL_SECS;
use crate::domain::ports::CacheBackend;

/// Default maximum number of cached entries.
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Serialized payload plus the TTL it was stored with. moka tracks its expiry.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    ttl: Duration,
}

/// Expires each entry after the TTL given to its latest `set`.
struct PerEntryTtl;

impl Expiry<String, CacheEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

pub struct MemoryCacheBackend {
    entries: Cache<String, CacheEntry>,
    unavailable: AtomicBool,
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }
}

impl std::fmt::Debug for MemoryCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheBackend")
            .field("entries", &self.entries.entry_count())
            .field("unavailable", &self.unavailable.load(Ordering::SeqCst))
            .finish()
    }
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend holding at most `max_capacity` entries.
    pub fn with_capacity(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self {
            entries,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate an outage: every call fails with `BackendUnavailable` until
    /// switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Run moka's pending housekeeping, evicting expired entries now.
    pub async fn purge_expired(&self) {
        self.entries.run_pending_tasks().await;
    }

    /// Number of live entries after housekeeping.
    pub async fn len(&self) -> u64 {
        self.purge_expired().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::BackendUnavailable(
                "memory backend marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.check_available()?;
        Ok(self.entries.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.check_available()?;
        let entry = CacheEntry {
            value,
            ttl: ttl.min(Duration::from_secs(MAX_TTL_SECS)),
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
