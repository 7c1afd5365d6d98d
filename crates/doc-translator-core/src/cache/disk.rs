use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use super::CacheKey;
use crate::error::{Error, Result};
use crate::util::unix_now;

/// What is persisted per key.
#[derive(Debug, Serialize, Deserialize)]
struct StoredCompletion {
    text: String,
    stored_at: u64,
}

/// Completions persisted in a sled tree, one JSON record per key.
pub struct DiskCache {
    db: sled::Db,
}

impl DiskCache {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::CacheInit(format!("cannot create {}: {e}", parent.display())))?;
        }

        let db = sled::open(path).map_err(|e| match e {
            sled::Error::Io(ref io) if io.kind() == std::io::ErrorKind::WouldBlock => Error::CacheInit(format!(
                "{} is in use by another process; stop it or remove {}/db/LOCK after a crash",
                path.display(),
                path.display()
            )),
            other => Error::CacheInit(format!("cannot open {}: {other}", path.display())),
        })?;

        debug!("Post-edit cache at {} holds {} entries", path.display(), db.len());
        Ok(Self { db })
    }

    /// Stored text for `key`. Unreadable records count as misses.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let raw = match self.db.get(key.as_str()) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Post-edit cache read failed: {}", e);
                return None;
            }
        };
        match serde_json::from_slice::<StoredCompletion>(&raw) {
            Ok(record) => Some(record.text),
            Err(e) => {
                warn!("Ignoring unreadable cache record {}: {}", key, e);
                None
            }
        }
    }

    pub fn insert(&self, key: &CacheKey, text: &str) -> Result<()> {
        let record = serde_json::to_vec(&StoredCompletion {
            text: text.to_string(),
            stored_at: unix_now(),
        })
        .map_err(|e| Error::CacheWrite(e.to_string()))?;

        self.db
            .insert(key.as_str(), record)
            .and_then(|_| self.db.flush())
            .map_err(|e| Error::CacheWrite(e.to_string()))?;
        Ok(())
    }

    /// Drop every record. Returns how many there were.
    pub fn clear(&self) -> Result<usize> {
        let count = self.db.len();
        self.db
            .clear()
            .and_then(|()| self.db.flush())
            .map_err(|e| Error::CacheWrite(e.to_string()))?;
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    #[cfg(test)]
    fn insert_raw(&self, key: &CacheKey, raw: &[u8]) {
        let _ = self.db.insert(key.as_str(), raw);
    }
}
