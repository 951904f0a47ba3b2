//! Storage backend trait and typed storage layer

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::Result;

/// Raw string key-value store.
///
/// Keys are global: a backend knows nothing about namespaces. "Not found" is
/// never an error; only genuine backend failures are reported through `Err`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Get the raw payload stored under `key`
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store a raw payload, replacing any previous one
    async fn set_item(&self, key: &str, value: String) -> Result<()>;

    /// Remove a key, returning whether it existed
    async fn remove_item(&self, key: &str) -> Result<bool>;

    /// List every key in the store
    async fn get_all_keys(&self) -> Result<Vec<String>>;

    /// Remove several keys in one call
    async fn multi_remove(&self, keys: &[String]) -> Result<()>;
}

// == Storage ==
/// JSON (de)serializing wrapper around a [`StorageBackend`].
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn StorageBackend>,
}

impl Storage {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    // == Get ==
    /// Fetches and decodes the value under `key`.
    ///
    /// A payload that does not decode as `T` is logged and reported as absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.backend.get_item(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Malformed payload under '{}': {}", key, e);
                Ok(None)
            }
        }
    }

    // == Store ==
    pub async fn store<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.set_item(key, raw).await
    }

    // == Delete ==
    /// Removes `key`; `false` when it was not present.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.backend.remove_item(key).await
    }

    /// All keys in the backend, unscoped.
    pub async fn get_all_keys(&self) -> Result<Vec<String>> {
        self.backend.get_all_keys().await
    }

    pub async fn multi_remove(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.backend.multi_remove(keys).await
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}
