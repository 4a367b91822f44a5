pub mod client;
pub mod memory;
pub mod valkey;

use std::sync::Arc;

pub use client::{CacheClient, CacheError};
pub use memory::MemoryCache;
pub use valkey::ValkeyClient;

/// Build the cache backend: Valkey when a URL is configured, in-process otherwise.
pub async fn build_cache(redis_url: Option<&str>) -> Result<Arc<dyn CacheClient>, CacheError> {
    match redis_url {
        Some(url) => {
            let client = ValkeyClient::new(url).await?;
            Ok(Arc::new(client))
        }
        None => {
            tracing::warn!("REDIS_URL not set; using in-process cache (single instance only)");
            Ok(Arc::new(MemoryCache::new()))
        }
    }
}
