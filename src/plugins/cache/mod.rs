//! Persisted plugin cache.
//!
//! Each plugin owns one named key-value blob. The registry restores it when
//! the plugin becomes ready and saves it on unload; the last save wins.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{CacheBackend, PluginsConfig};
use crate::error::CacheError;

pub mod memory;
pub mod redb;

pub use memory::MemoryStore;
pub use redb::RedbStore;

/// Contents of one plugin's cache.
pub type CacheBlob = serde_json::Map<String, Value>;

/// Load-by-name and save-by-name storage for cache blobs.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// The blob last saved under `name`, if any.
    async fn load(&self, name: &str) -> Result<Option<CacheBlob>, CacheError>;

    /// Replace the blob stored under `name`.
    async fn save(&self, name: &str, blob: &CacheBlob) -> Result<(), CacheError>;
}

/// Open the store selected by the plugin configuration.
pub fn open_store(config: &PluginsConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    match config.cache {
        CacheBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        CacheBackend::Redb => Ok(Arc::new(RedbStore::new(&config.cache_path)?)),
    }
}

/// A plugin's live cache. Clones share the same contents, so callbacks can
/// capture one and the registry still sees their writes at unload.
#[derive(Debug, Clone, Default)]
pub struct PluginCache {
    inner: Arc<Mutex<CacheBlob>>,
}

impl PluginCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner.lock().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.lock().remove(key)
    }

    /// Read a value as `T`. A missing key is `Ok(None)`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.get(key)
            .map(|v| serde_json::from_value(v).map_err(|e| CacheError::Serialization(e.to_string())))
            .transpose()
    }

    /// Store any serializable value.
    pub fn set_as<T: Serialize>(&self, key: impl Into<String>, value: &T) -> Result<(), CacheError> {
        let value =
            serde_json::to_value(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.set(key, value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub(crate) fn snapshot(&self) -> CacheBlob {
        self.inner.lock().clone()
    }

    pub(crate) fn restore(&self, blob: CacheBlob) {
        *self.inner.lock() = blob;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_contents() {
        let cache = PluginCache::new();
        let captured = cache.clone();
        captured.set("hits", 3);
        assert_eq!(cache.get("hits"), Some(Value::from(3)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_typed_access() {
        let cache = PluginCache::new();
        cache.set_as("seen", &vec!["alice", "bob"]).unwrap();
        let seen: Vec<String> = cache.get_as("seen").unwrap().unwrap();
        assert_eq!(seen, vec!["alice", "bob"]);

        assert_eq!(cache.get_as::<u32>("missing").unwrap(), None);
        assert!(cache.get_as::<u32>("seen").is_err());
    }

    #[test]
    fn test_restore_replaces() {
        let cache = PluginCache::new();
        cache.set("old", true);
        let mut blob = CacheBlob::new();
        blob.insert("new".into(), Value::from("x"));
        cache.restore(blob);
        assert!(cache.get("old").is_none());
        assert_eq!(cache.snapshot().len(), 1);
    }
}
