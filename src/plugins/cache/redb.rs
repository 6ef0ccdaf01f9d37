//! Redb-backed persistent cache store.
//!
//! One table keyed by plugin name; values are JSON documents carrying the
//! blob and the time it was saved.

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, TableDefinition, TableError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::{CacheBlob, CacheStore};
use crate::error::CacheError;

const CACHE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("plugin_cache");

#[derive(Debug, Serialize, Deserialize)]
struct StoredBlob {
    /// Milliseconds since the epoch.
    saved_at: i64,
    entries: CacheBlob,
}

pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let db = Database::create(path).map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl CacheStore for RedbStore {
    async fn load(&self, name: &str) -> Result<Option<CacheBlob>, CacheError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| CacheError::Database(e.to_string()))?;
        let table = match read_txn.open_table(CACHE_TABLE) {
            Ok(table) => table,
            // Nothing has been saved yet.
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(CacheError::Database(e.to_string())),
        };

        let Some(value) = table
            .get(name)
            .map_err(|e| CacheError::Database(e.to_string()))?
        else {
            return Ok(None);
        };
        let stored: StoredBlob = serde_json::from_slice(value.value())
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        Ok(Some(stored.entries))
    }

    async fn save(&self, name: &str, blob: &CacheBlob) -> Result<(), CacheError> {
        let stored = StoredBlob {
            saved_at: chrono::Utc::now().timestamp_millis(),
            entries: blob.clone(),
        };
        let value =
            serde_json::to_vec(&stored).map_err(|e| CacheError::Serialization(e.to_string()))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| CacheError::Database(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(CACHE_TABLE)
                .map_err(|e| CacheError::Database(e.to_string()))?;
            table
                .insert(name, value.as_slice())
                .map_err(|e| CacheError::Database(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let store = RedbStore::new(&path).unwrap();
            assert!(store.load("search").await.unwrap().is_none());

            let mut blob = CacheBlob::new();
            blob.insert("queries".into(), Value::from(7));
            store.save("search", &blob).await.unwrap();
        }

        let store = RedbStore::new(&path).unwrap();
        let blob = store.load("search").await.unwrap().unwrap();
        assert_eq!(blob["queries"], Value::from(7));
        assert!(store.load("other").await.unwrap().is_none());
    }
}
