//! Log of produced files.

use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::util::unix_now;

/// One produced file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedFile {
    pub file_name: String,
    pub file_path: String,
    /// Unix seconds
    pub created_at: u64,
}

/// Append-only history stored in sled; keys are big-endian sequence ids so
/// iteration order is insertion order.
pub struct HistoryStore {
    db: Db,
}

impl HistoryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::HistoryInit(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let db = sled::open(path)
            .map_err(|e| Error::HistoryInit(format!("{}: {}", path.display(), e)))?;
        debug!("Opened history at {}", path.display());
        Ok(Self { db })
    }

    /// In-memory store, gone when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| Error::HistoryInit(e.to_string()))?;
        Ok(Self { db })
    }

    pub fn add(&self, file_name: impl Into<String>, file_path: impl Into<String>) -> Result<TranslatedFile> {
        let entry = TranslatedFile {
            file_name: file_name.into(),
            file_path: file_path.into(),
            created_at: unix_now(),
        };
        let id = self.db.generate_id().map_err(|e| Error::History(e.to_string()))?;
        let value = serde_json::to_vec(&entry).map_err(|e| Error::History(e.to_string()))?;
        self.db
            .insert(id.to_be_bytes(), value)
            .map_err(|e| Error::History(e.to_string()))?;
        self.db.flush().map_err(|e| Error::History(e.to_string()))?;
        Ok(entry)
    }

    /// Entries, newest first. Unreadable entries are logged and skipped.
    pub fn list(&self) -> Vec<TranslatedFile> {
        self.db
            .iter()
            .rev()
            .filter_map(|item| match item {
                Ok((_, value)) => serde_json::from_slice(&value)
                    .map_err(|e| warn!("Skipping corrupt history entry: {}", e))
                    .ok(),
                Err(e) => {
                    warn!("History read error: {}", e);
                    None
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}
