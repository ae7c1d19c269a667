//! Cache-aside wrapper around an async producer.
//!
//! A fetcher owns one key space and one result type. On every call it checks
//! the typed cache, and on a miss runs the producer, stores the result and
//! notifies its [`MissHook`]. A backend outage reads as a miss so the read
//! path stays correct, only slower, while the cache is down.
//!
//! There is no single-flight protection: two concurrent misses for the same
//! key both run the producer and both write the cache.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::cache_key::{CacheKeyBuilder, KeyParams};
use super::typed_cache::TypedCache;
use crate::domain::errors::CacheError;
use crate::domain::models::{Shape, Shaped};

/// A fetched value and whether it was served from cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched<T> {
    pub value: T,
    pub cached: bool,
}

/// Side effect run after a miss has produced a fresh value.
///
/// Must not block: it runs on the caller's path before the value is returned.
pub trait MissHook<T>: Send + Sync {
    fn on_miss(&self, key: &str, value: &T);
}

/// Point-in-time copy of a fetcher's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub hits: u64,
    pub misses: u64,
    /// Reads that failed at the backend and were treated as misses.
    pub degraded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    degraded: AtomicU64,
}

/// Cache-aside fetcher for values of type `T`.
pub struct MemoizingFetcher<T> {
    cache: Arc<TypedCache>,
    keys: CacheKeyBuilder,
    shape: Shape,
    ttl: Option<Duration>,
    miss_hook: Option<Arc<dyn MissHook<T>>>,
    counters: Counters,
}

impl<T> MemoizingFetcher<T>
where
    T: Shaped + Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(cache: Arc<TypedCache>, keys: CacheKeyBuilder) -> Self {
        Self {
            cache,
            keys,
            shape: T::shape(),
            ttl: None,
            miss_hook: None,
            counters: Counters::default(),
        }
    }

    /// Override the cache's default TTL for this key space.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_miss_hook(mut self, hook: Arc<dyn MissHook<T>>) -> Self {
        self.miss_hook = Some(hook);
        self
    }

    pub fn key_for(&self, params: &KeyParams) -> String {
        self.keys.build(params)
    }

    pub fn stats(&self) -> FetchStats {
        FetchStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            degraded: self.counters.degraded.load(Ordering::Relaxed),
        }
    }

    /// Serve `params` from cache, or run `producer` and cache its result.
    ///
    /// # Errors
    /// - the producer's own error, unchanged
    /// - [`CacheError::SerializationMismatch`] when a cached entry cannot be
    ///   rebuilt into `T`
    pub async fn fetch<F, Fut, E>(&self, params: &KeyParams, producer: F) -> Result<Fetched<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CacheError>,
    {
        let key = self.keys.build(params);

        match self.cache.get_with_shape::<T>(&key, &self.shape).await {
            Ok(Some(value)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%key, "cache hit");
                return Ok(Fetched {
                    value,
                    cached: true,
                });
            }
            Ok(None) => {
                tracing::debug!(%key, "cache miss");
            }
            Err(CacheError::BackendUnavailable(reason)) => {
                self.counters.degraded.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    %key,
                    backend = self.cache.backend_name(),
                    %reason,
                    "cache read failed, treating as miss"
                );
            }
            Err(err) => return Err(err.into()),
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let value = producer().await?;

        if let Err(err) = self.cache.set(&key, &value, self.ttl).await {
            tracing::warn!(%key, error = %err, "cache write failed, result not cached");
        }

        if let Some(hook) = &self.miss_hook {
            hook.on_miss(&key, &value);
        }

        Ok(Fetched {
            value,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cache::MemoryCacheBackend;
    use crate::domain::errors::MetricError;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn fetcher() -> MemoizingFetcher<Vec<u32>> {
        let cache = Arc::new(TypedCache::new(
            Arc::new(MemoryCacheBackend::new()),
            Duration::from_secs(60),
        ));
        MemoizingFetcher::new(cache, CacheKeyBuilder::new("test", "numbers"))
    }

    #[derive(Default)]
    struct RecordingHook {
        keys: Mutex<Vec<String>>,
    }

    impl MissHook<Vec<u32>> for RecordingHook {
        fn on_miss(&self, key: &str, _value: &Vec<u32>) {
            self.keys.lock().unwrap().push(key.to_string());
        }
    }

    #[tokio::test]
    async fn test_second_fetch_is_cached() {
        let fetcher = fetcher();
        let calls = AtomicUsize::new(0);
        let params = KeyParams::new().arg(1);

        for expected_cached in [false, true] {
            let fetched = fetcher
                .fetch(&params, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, MetricError>(vec![1, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(fetched.value, vec![1, 2, 3]);
            assert_eq!(fetched.cached, expected_cached);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            fetcher.stats(),
            FetchStats {
                hits: 1,
                misses: 1,
                degraded: 0
            }
        );
    }

    #[tokio::test]
    async fn test_producer_error_is_not_cached() {
        let fetcher = fetcher();
        let params = KeyParams::new();

        let first = fetcher
            .fetch(&params, || async {
                Err::<Vec<u32>, _>(MetricError::PartitionListingFailed("down".to_string()))
            })
            .await;
        assert!(first.is_err());

        let second = fetcher
            .fetch(&params, || async { Ok::<_, MetricError>(vec![9]) })
            .await
            .unwrap();
        assert!(!second.cached);
    }

    #[tokio::test]
    async fn test_miss_hook_runs_only_on_miss() {
        let hook = Arc::new(RecordingHook::default());
        let fetcher = fetcher().with_miss_hook(hook.clone());
        let params = KeyParams::new().arg("x");

        for _ in 0..3 {
            fetcher
                .fetch(&params, || async { Ok::<_, MetricError>(vec![1]) })
                .await
                .unwrap();
        }

        let keys = hook.keys.lock().unwrap();
        assert_eq!(keys.as_slice(), [fetcher.key_for(&params)]);
    }
}
