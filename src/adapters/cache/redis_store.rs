//! Redis cache backend.
//!
//! One multiplexed [`ConnectionManager`] is shared by every caller and
//! reconnects on its own after a dropped connection. Expiry is delegated to
//! Redis via `SET EX`.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use crate::domain::errors::CacheError;
use crate::domain::models::MAX_TTL_SECS;
use crate::domain::ports::CacheBackend;

#[derive(Clone)]
pub struct RedisCacheBackend {
    connection: ConnectionManager,
}

impl RedisCacheBackend {
    /// Connect to `url`, e.g. `redis://127.0.0.1:6379`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let connection = ConnectionManager::new(client).await.map_err(unavailable)?;
        tracing::info!(url, "connected to redis cache");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut connection = self.connection.clone();
        connection.get(key).await.map_err(unavailable)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        let seconds = ttl.as_secs().clamp(1, MAX_TTL_SECS);
        connection
            .set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(unavailable)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

fn unavailable(err: redis::RedisError) -> CacheError {
    CacheError::BackendUnavailable(err.to_string())
}
