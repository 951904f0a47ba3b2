//! JSON file storage backend
//!
//! Keeps the whole keyspace as one JSON object on disk. The file is read on
//! first access and rewritten after every mutation via a temp file + rename.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::StorageBackend;
use crate::error::Result;

type Items = BTreeMap<String, String>;

// == File Backend ==
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    /// None until the file has been loaded
    items: Mutex<Option<Items>>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            items: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Items> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Items::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Items::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Sibling of the target with `.tmp` appended to the full file name.
    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn persist(&self, items: &Items) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, serde_json::to_vec(items)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Persisted {} keys to {}", items.len(), self.path.display());
        Ok(())
    }

    /// Runs `f` against the loaded keyspace, persisting afterwards if it
    /// reports a change.
    ///
    /// If persisting fails the in-memory copy is dropped, so the next call
    /// reloads whatever is on disk.
    async fn with_items<R>(&self, f: impl FnOnce(&mut Items) -> (R, bool)) -> Result<R> {
        let mut guard = self.items.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let items = guard.get_or_insert_with(Items::new);

        let (result, changed) = f(items);
        if changed {
            let persisted = self.persist(items).await;
            if let Err(e) = persisted {
                warn!("Failed to persist {}: {}", self.path.display(), e);
                *guard = None;
                return Err(e);
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.with_items(|items| (items.get(key).cloned(), false)).await
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        self.with_items(|items| {
            items.insert(key.to_string(), value);
            ((), true)
        })
        .await
    }

    async fn remove_item(&self, key: &str) -> Result<bool> {
        self.with_items(|items| {
            let removed = items.remove(key).is_some();
            (removed, removed)
        })
        .await
    }

    async fn get_all_keys(&self) -> Result<Vec<String>> {
        self.with_items(|items| (items.keys().cloned().collect(), false))
            .await
    }

    async fn multi_remove(&self, keys: &[String]) -> Result<()> {
        self.with_items(|items| {
            let before = items.len();
            for key in keys {
                items.remove(key);
            }
            ((), items.len() != before)
        })
        .await
    }
}
