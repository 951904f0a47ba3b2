//! In-memory storage backend

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::StorageBackend;
use crate::error::Result;

// == Memory Backend ==
/// HashMap-backed store, shared behind a tokio RwLock.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys across all namespaces.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        self.items.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<bool> {
        Ok(self.items.write().await.remove(key).is_some())
    }

    async fn get_all_keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().await.keys().cloned().collect())
    }

    async fn multi_remove(&self, keys: &[String]) -> Result<()> {
        let mut items = self.items.write().await;
        for key in keys {
            items.remove(key);
        }
        Ok(())
    }
}
