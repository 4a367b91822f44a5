use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use crate::services::cache::{CacheClient, CacheError};

/// Single-use bookkeeping for approval tokens.
pub trait ReplayStore: Send + Sync {
    // Atomically check whether `key` was already seen and store it with TTL.
    //
    // Returns:
    // - Ok(true)  => first time (stored successfully)
    // - Ok(false) => replay detected (already exists)
    // - Err(_)    => backend failure (caller must refuse the token)
    fn check_and_store<'a>(
        &'a self,
        key: &'a str,
        ttl_secs: u64,
    ) -> Pin<Box<dyn Future<Output = Result<bool, CacheError>> + Send + 'a>>;
}

/// Replay store over any `CacheClient` (Valkey in production, memory otherwise).
#[derive(Clone)]
pub struct CacheReplayStore {
    cache: Arc<dyn CacheClient>,
    // Key prefix to avoid collisions with other cache users
    prefix: String,
}

impl CacheReplayStore {
    pub fn new(cache: Arc<dyn CacheClient>) -> Self {
        Self::new_with_prefix(cache, "approval:used")
    }

    pub fn new_with_prefix(cache: Arc<dyn CacheClient>, prefix: impl Into<String>) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
        }
    }

    pub fn key(&self, raw: &str) -> String {
        format!("{}:{}", self.prefix, raw)
    }
}

impl ReplayStore for CacheReplayStore {
    fn check_and_store<'a>(
        &'a self,
        key: &'a str,
        ttl_secs: u64,
    ) -> Pin<Box<dyn Future<Output = Result<bool, CacheError>> + Send + 'a>> {
        Box::pin(async move {
            let full_key = self.key(key);
            self.cache
                .set_if_absent_with_ttl(&full_key, "1", Duration::from_secs(ttl_secs))
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cache::MemoryCache;

    #[tokio::test]
    async fn second_check_is_a_replay() {
        let store = CacheReplayStore::new(Arc::new(MemoryCache::new()));
        assert!(store.check_and_store("jti-1", 60).await.unwrap());
        assert!(!store.check_and_store("jti-1", 60).await.unwrap());
        assert!(store.check_and_store("jti-2", 60).await.unwrap());
    }

    #[tokio::test]
    async fn prefixes_isolate_namespaces() {
        let cache: Arc<dyn CacheClient> = Arc::new(MemoryCache::new());
        let a = CacheReplayStore::new_with_prefix(cache.clone(), "a");
        let b = CacheReplayStore::new_with_prefix(cache, "b");

        assert!(a.check_and_store("same", 60).await.unwrap());
        assert!(b.check_and_store("same", 60).await.unwrap());
    }
}
