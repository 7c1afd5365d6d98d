use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use super::CacheKey;
use crate::config::CacheConfig;

/// Recently used completions, bounded by their size in bytes.
pub struct MemoryCache {
    entries: Cache<CacheKey, Arc<str>>,
}

fn entry_weight(key: &CacheKey, text: &Arc<str>) -> u32 {
    u32::try_from(key.as_str().len() + text.len()).unwrap_or(u32::MAX)
}

impl MemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(config.memory_max_mb.saturating_mul(1 << 20))
            .weigher(entry_weight);
        if config.memory_ttl_seconds > 0 {
            builder = builder.time_to_live(Duration::from_secs(config.memory_ttl_seconds));
        }
        Self {
            entries: builder.build(),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<str>> {
        self.entries.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, text: Arc<str>) {
        self.entries.insert(key, text).await;
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}
