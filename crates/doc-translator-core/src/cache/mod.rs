mod disk;
mod key;
mod memory;

pub use disk::DiskCache;
pub use key::{CacheKey, CompletionInputs};
pub use memory::MemoryCache;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::CacheConfig;
use crate::error::Result;

/// Post-edit completion cache: memory in front of disk.
pub struct CompletionCache {
    memory: Option<MemoryCache>,
    disk: Option<DiskCache>,
}

impl CompletionCache {
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let memory = config.memory_enabled.then(|| MemoryCache::new(config));
        let disk = if config.disk_enabled {
            Some(DiskCache::open(&disk_path(config))?)
        } else {
            None
        };
        Ok(Self { memory, disk })
    }

    /// A cache that never stores anything.
    pub const fn disabled() -> Self {
        Self {
            memory: None,
            disk: None,
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        if let Some(ref memory) = self.memory
            && let Some(text) = memory.get(key).await
        {
            return Some(text.to_string());
        }

        let text = self.disk.as_ref()?.get(key)?;
        if let Some(ref memory) = self.memory {
            memory.insert(key.clone(), Arc::from(text.as_str())).await;
        }
        Some(text)
    }

    /// Store a completion. Disk failures are logged, never returned.
    pub async fn insert(&self, key: &CacheKey, text: &str) {
        if let Some(ref memory) = self.memory {
            memory.insert(key.clone(), Arc::from(text)).await;
        }
        if let Some(ref disk) = self.disk
            && let Err(e) = disk.insert(key, text)
        {
            warn!("Completion {} kept in memory only: {}", key, e);
        }
    }

    pub fn clear(&self) {
        if let Some(ref memory) = self.memory {
            memory.clear();
        }
        if let Some(ref disk) = self.disk
            && let Err(e) = disk.clear()
        {
            warn!("Failed to clear disk cache: {}", e);
        }
    }
}

/// Configured disk location, or the per-user default.
fn disk_path(config: &CacheConfig) -> PathBuf {
    config
        .disk_path
        .clone()
        .unwrap_or_else(crate::util::post_edit_cache_path)
}

/// Empty the on-disk cache `config` points at.
///
/// Returns the number of entries removed; a cache that was never created
/// counts as empty.
pub fn clear_post_edit_cache(config: &CacheConfig) -> Result<usize> {
    clear_disk_cache_at(&disk_path(config))
}

fn clear_disk_cache_at(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }
    let removed = DiskCache::open(path)?.clear()?;
    info!("Removed {} cached completions from {}", removed, path.display());
    Ok(removed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Lang;

    fn sample_key(text: &str) -> CacheKey {
        CacheKey::new(&CompletionInputs {
            group_text: text,
            model: "gpt-4",
            source_lang: &Lang::new("FR"),
            target_lang: &Lang::new("EN"),
            language_level: "standard",
            glossary: "{}",
        })
    }

    #[tokio::test]
    async fn test_memory_only_roundtrip() {
        let cache = CompletionCache::new(&CacheConfig {
            disk_enabled: false,
            ..Default::default()
        })
        .unwrap();

        let key = sample_key("Bonjour");
        assert!(cache.get(&key).await.is_none());
        cache.insert(&key, "Hello").await;
        assert_eq!(cache.get(&key).await.as_deref(), Some("Hello"));

        cache.clear();
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_disk_layer_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            memory_enabled: false,
            disk_path: Some(dir.path().join("cache")),
            ..Default::default()
        };
        let key = sample_key("Au revoir");

        {
            let cache = CompletionCache::new(&config).unwrap();
            cache.insert(&key, "Goodbye").await;
        }

        let reopened = CompletionCache::new(&config).unwrap();
        assert_eq!(reopened.get(&key).await.as_deref(), Some("Goodbye"));
    }

    #[tokio::test]
    async fn test_disk_hit_is_promoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache");
        let key = sample_key("Merci");
        DiskCache::open(&path).unwrap().insert(&key, "Thanks").unwrap();

        let cache = CompletionCache::new(&CacheConfig {
            disk_path: Some(path),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(cache.get(&key).await.as_deref(), Some("Thanks"));
        assert_eq!(
            cache.memory.as_ref().unwrap().get(&key).await.as_deref(),
            Some("Thanks")
        );
    }

    #[test]
    fn test_clear_missing_cache_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(clear_disk_cache_at(&dir.path().join("absent")).unwrap(), 0);

        let path = dir.path().join("present");
        DiskCache::open(&path).unwrap().insert(&sample_key("a"), "b").unwrap();
        assert_eq!(clear_disk_cache_at(&path).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear_uses_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            memory_enabled: false,
            disk_path: Some(dir.path().join("configured")),
            ..Default::default()
        };
        let key = sample_key("Salut");
        CompletionCache::new(&config).unwrap().insert(&key, "Hi").await;

        assert_eq!(clear_post_edit_cache(&config).unwrap(), 1);
        let reopened = CompletionCache::new(&config).unwrap();
        assert!(reopened.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_never_hits() {
        let cache = CompletionCache::disabled();
        let key = sample_key("x");
        cache.insert(&key, "y").await;
        assert!(cache.get(&key).await.is_none());
    }
}
