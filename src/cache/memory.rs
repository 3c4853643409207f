use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry as MapEntry, DashMap};
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use super::Cache;
use crate::error::CacheError;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Thread-safe in-process cache with per-key expiry.
///
/// Backed by a DashMap so reads are concurrent and lock-free for most cases.
/// Expired entries read as absent. They are dropped the next time they are
/// touched or by the sweeper from [`MemoryCache::spawn_sweeper`], whichever
/// comes first. Uses the tokio clock, so paused-time tests can drive expiry.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.inner.iter().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge(&self.inner)
    }

    /// Purge expired entries every `every` on a background task.
    ///
    /// The task holds only a weak reference and exits once the last clone of
    /// this cache is dropped.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let map: Weak<DashMap<String, Entry>> = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(map) = map.upgrade() else { break };
                let removed = purge(&map);
                if removed > 0 {
                    tracing::debug!("cache sweep removed {} expired entries", removed);
                }
            }
        })
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        if let Some(entry) = self.inner.get(key) {
            if entry.is_live(now) {
                return Some(entry.value.clone());
            }
        }
        // Expired (or never there): evict without racing a fresh write.
        self.inner.remove_if(key, |_, e| !e.is_live(now));
        None
    }
}

fn purge(map: &DashMap<String, Entry>) -> usize {
    let now = Instant::now();
    let before = map.len();
    map.retain(|_, e| e.is_live(now));
    before.saturating_sub(map.len())
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.live_value(key))
    }

    async fn get_int(&self, key: &str) -> Result<Option<i64>, CacheError> {
        match self.live_value(key) {
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| CacheError::NotInteger { key: key.to_owned() }),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.inner.insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key);
        Ok(())
    }

    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let now = Instant::now();
        let expires_at = now + ttl;

        // The entry guard holds the shard lock, so read-modify-write and the
        // expiry reset happen as one step.
        match self.inner.entry(key.to_owned()) {
            MapEntry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                let current = if entry.is_live(now) {
                    entry
                        .value
                        .parse::<i64>()
                        .map_err(|_| CacheError::NotInteger { key: key.to_owned() })?
                } else {
                    0
                };
                let next = current + 1;
                entry.value = next.to_string();
                entry.expires_at = expires_at;
                Ok(next)
            }
            MapEntry::Vacant(slot) => {
                slot.insert(Entry {
                    value: "1".to_owned(),
                    expires_at,
                });
                Ok(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn set_then_get_until_expiry() {
        let cache = MemoryCache::new();
        cache
            .set("url:abc", "https://example.com", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            cache.get("url:abc").await.unwrap().as_deref(),
            Some("https://example.com")
        );

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get("url:abc").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn missing_keys_are_none_not_errors() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("nope").await.unwrap(), None);
        assert_eq!(cache.get_int("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_int_rejects_text() {
        let cache = MemoryCache::new();
        cache.set("k", "hello", Duration::from_secs(5)).await.unwrap();
        assert!(matches!(
            cache.get_int("k").await,
            Err(CacheError::NotInteger { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn counter_window_slides_and_resets() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(3600);

        assert_eq!(cache.increment_with_expiry("hits", ttl).await.unwrap(), 1);
        tokio::time::advance(Duration::from_secs(3000)).await;
        assert_eq!(cache.increment_with_expiry("hits", ttl).await.unwrap(), 2);

        // Each increment pushed the expiry out again.
        tokio::time::advance(Duration::from_secs(3000)).await;
        assert_eq!(cache.get_int("hits").await.unwrap(), Some(2));

        // Once expired, the count starts over.
        tokio::time::advance(Duration::from_secs(3601)).await;
        assert_eq!(cache.get_int("hits").await.unwrap(), None);
        assert_eq!(cache.increment_with_expiry("hits", ttl).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    cache.increment_with_expiry("hits", ttl).await.unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(cache.get_int("hits").await.unwrap(), Some(800));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_cold_keys_from_the_map() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(600);
        for i in 0..1000 {
            cache.set(&format!("url:{i}"), "https://example.com", ttl).await.unwrap();
            cache.increment_with_expiry(&format!("hits:1h:{i}"), ttl).await.unwrap();
        }

        time::advance(Duration::from_secs(24 * 3600)).await;
        for i in 0..10 {
            cache.set(&format!("fresh:{i}"), "v", ttl).await.unwrap();
        }

        assert_eq!(cache.purge_expired(), 2000);
        assert_eq!(cache.inner.len(), 10);
        assert_eq!(cache.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_in_the_background() {
        let cache = MemoryCache::new();
        let sweeper = cache.spawn_sweeper(Duration::from_secs(60));

        for i in 0..100 {
            cache
                .set(&format!("url:{i}"), "https://example.com", Duration::from_secs(30))
                .await
                .unwrap();
        }
        cache
            .set("url:hot", "https://example.com", Duration::from_secs(3600))
            .await
            .unwrap();

        // Idle sleep lets the paused clock run through the first sweep.
        time::sleep(Duration::from_secs(61)).await;

        assert_eq!(cache.inner.len(), 1);
        assert_eq!(cache.get("url:hot").await.unwrap().as_deref(), Some("https://example.com"));

        drop(cache);
        time::sleep(Duration::from_secs(61)).await;
        assert!(sweeper.is_finished());
    }

    #[tokio::test]
    async fn delete_removes() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(5)).await.unwrap();
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
