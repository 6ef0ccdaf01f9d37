//! In-memory cache store. Contents live as long as the process.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{CacheBlob, CacheStore};
use crate::error::CacheError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: DashMap<String, CacheBlob>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn load(&self, name: &str) -> Result<Option<CacheBlob>, CacheError> {
        Ok(self.blobs.get(name).map(|b| b.value().clone()))
    }

    async fn save(&self, name: &str, blob: &CacheBlob) -> Result<(), CacheError> {
        self.blobs.insert(name.to_string(), blob.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = MemoryStore::new();
        assert!(store.load("p").await.unwrap().is_none());

        let mut blob = CacheBlob::new();
        blob.insert("n".into(), Value::from(1));
        store.save("p", &blob).await.unwrap();
        blob.insert("n".into(), Value::from(2));
        store.save("p", &blob).await.unwrap();

        assert_eq!(store.load("p").await.unwrap().unwrap()["n"], Value::from(2));
    }
}
