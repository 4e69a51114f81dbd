//! Redis cache backend over a `deadpool-redis` connection pool.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime, redis::AsyncCommands};

use super::{CacheError, CacheStore};

fn unavailable(err: impl std::fmt::Display) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

/// [`CacheStore`] backed by Redis (`GET`, `SET .. EX`, `DEL`).
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Builds the connection pool. Connections are opened lazily, so an
    /// unreachable server only surfaces on the first cache call.
    pub fn connect(url: &str) -> Result<Self, CacheError> {
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(unavailable)?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        conn.get(key).await.map_err(unavailable)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        // Redis rejects `EX 0`.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(unavailable)
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        let _deleted: i64 = conn.del(key).await.map_err(unavailable)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close();
    }
}
