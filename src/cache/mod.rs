//! Ephemeral key-value cache: resolved URLs and hit counters.

mod memory;
mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

/// The key-value operations the engine relies on.
///
/// Absent keys are `Ok(None)`, never an error. Implementations must be safe
/// for unbounded concurrent use.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Like [`Cache::get`] but parses the value as an integer counter.
    async fn get_int(&self, key: &str) -> Result<Option<i64>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Increment the counter at `key` (starting from zero) and reset its
    /// expiry to `ttl`, as one atomic unit. Returns the new count.
    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, CacheError>;
}
