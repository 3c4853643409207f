use std::time::Duration;

use ::redis::{aio::ConnectionManager, AsyncCommands};
use async_trait::async_trait;
use tracing::{debug, trace};

use super::Cache;
use crate::error::CacheError;

/// Redis-backed cache.
///
/// The connection manager multiplexes one connection across all callers and
/// reconnects on its own after a failure, so every call just clones it.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379/0`) and verify the
    /// server answers `PING`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = ::redis::Client::open(url)?;
        let mut conn = ConnectionManager::new(client).await?;

        let pong: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        debug!("Redis connection test successful: {}", pong);

        Ok(Self { conn })
    }
}

/// Redis rejects a zero expiry, so anything shorter is rounded up to 1s.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        trace!("redis GET {} -> {}", key, if value.is_some() { "hit" } else { "miss" });
        Ok(value)
    }

    async fn get_int(&self, key: &str) -> Result<Option<i64>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| CacheError::NotInteger { key: key.to_owned() }),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();

        // MULTI / INCR / EXPIRE / EXEC: the counter can never exist without
        // the expiry that belongs to it.
        let (count,): (i64,) = ::redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, ttl_secs(ttl) as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count)
    }
}
