use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{sync::RwLock, time::Instant};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// String key/value store with per-key expiry.
///
/// A zero `ttl` stores the value without expiry. `get` returns `Ok(None)` for
/// a missing or expired key; errors are reserved for transport failures.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// In-process cache for tests and single-node local runs.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining lifetime of a live key. `None` for missing keys and for keys without expiry.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        let mut entries = self.entries.write().await;
        // expired entries are swept on write
        let now = Instant::now();
        entries.retain(|_, e| e.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v1", Duration::from_secs(60))
            .await
            .expect("set");
        assert_eq!(cache.get("k").await.expect("get").as_deref(), Some("v1"));

        cache
            .set("k", "v2", Duration::from_secs(60))
            .await
            .expect("overwrite");
        assert_eq!(cache.get("k").await.expect("get").as_deref(), Some("v2"));

        cache.delete("k").await.expect("delete");
        assert_eq!(cache.get("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn delete_of_missing_key_is_ok() {
        let cache = MemoryCache::new();
        assert!(cache.delete("nope").await.is_ok());
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = MemoryCache::new();
        cache
            .set("short", "v", Duration::from_millis(10))
            .await
            .expect("set");
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("short").await.expect("get"), None);
        assert_eq!(cache.ttl("short").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn zero_ttl_means_no_expiry() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::ZERO).await.expect("set");
        assert_eq!(cache.ttl("k").await, None);
        assert_eq!(cache.get("k").await.expect("get").as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn ttl_reports_remaining_lifetime() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v", Duration::from_secs(3600))
            .await
            .expect("set");
        let ttl = cache.ttl("k").await.expect("has ttl");
        assert!(ttl <= Duration::from_secs(3600));
        assert!(ttl > Duration::from_secs(3590));
    }
}
