use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::services::cache::client::{CacheClient, CacheError, CacheResult};

/// In-process cache used when `REDIS_URL` is not configured (and in tests).
///
/// State is per process: single-use guarantees only hold for a single instance.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(entry: &Entry, now: Instant) -> bool {
        entry.expires_at > now
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_string(&self, key: &str) -> CacheResult<Option<String>> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|e| Self::live(e, now))
            .map(|e| e.value.clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        // Opportunistic sweep keeps the map bounded without a background task.
        entries.retain(|_, e| Self::live(e, now));
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> CacheResult<bool> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, e| Self::live(e, now));
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn del(&self, key: &str) -> CacheResult<u64> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        Ok(match entries.remove(key) {
            Some(e) if Self::live(&e, now) => 1,
            _ => 0,
        })
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> CacheResult<u64> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, e| Self::live(e, now));
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: now + ttl,
        });
        let n = entry
            .value
            .parse::<u64>()
            .map_err(|_| CacheError::InvalidValue(format!("{key} is not a counter")))?
            .saturating_add(1);
        entry.value = n.to_string();
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_if_absent_only_succeeds_once() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);

        assert!(cache.set_if_absent_with_ttl("k", "1", ttl).await.unwrap());
        assert!(!cache.set_if_absent_with_ttl("k", "2", ttl).await.unwrap());
        assert_eq!(cache.get_string("k").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn expired_entries_are_invisible() {
        let cache = MemoryCache::new();
        cache
            .set_with_ttl("k", "v", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get_string("k").await.unwrap(), None);
        assert_eq!(cache.del("k").await.unwrap(), 0);
        assert!(
            cache
                .set_if_absent_with_ttl("k", "again", Duration::from_secs(1))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn counter_keeps_its_first_ttl() {
        let cache = MemoryCache::new();

        assert_eq!(cache.incr_with_ttl("c", Duration::from_millis(20)).await.unwrap(), 1);
        assert_eq!(cache.incr_with_ttl("c", Duration::from_secs(60)).await.unwrap(), 2);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.incr_with_ttl("c", Duration::from_secs(60)).await.unwrap(), 1);

        cache.set_with_ttl("s", "text", Duration::from_secs(60)).await.unwrap();
        assert!(matches!(
            cache.incr_with_ttl("s", Duration::from_secs(60)).await,
            Err(CacheError::InvalidValue(_))
        ));
    }

    #[tokio::test]
    async fn del_reports_removed_keys() {
        let cache = MemoryCache::new();
        cache
            .set_with_ttl("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.del("k").await.unwrap(), 1);
        assert_eq!(cache.del("k").await.unwrap(), 0);
    }
}
