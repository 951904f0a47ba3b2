//! LRU Strategy Module
//!
//! Least Recently Used eviction, with the recency list persisted through the
//! cache it bounds.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::{CacheCore, CacheStrategy, CachedItem, KeyBuilder, NEVER_EXPIRES};
use crate::error::Result;

/// Logical key of the recency list inside the cache namespace.
pub const LRU_DATA_KEY: &str = "lruStrategyData";

/// Default number of cached values, metadata record excluded.
pub const DEFAULT_CAPACITY: usize = 1000;

// == LRU Data ==
/// Recency list persisted under [`LRU_DATA_KEY`].
///
/// - Front = Most recently used
/// - Back = Least recently used
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LruData {
    read_history: VecDeque<String>,
}

impl LruData {
    // == Touch ==
    /// Marks a key as recently used (moves to front).
    pub fn touch(&mut self, key: &str) {
        self.remove(key);
        self.read_history.push_front(key.to_string());
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) {
        self.read_history.retain(|k| k != key);
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        self.read_history.pop_back()
    }

    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&String> {
        self.read_history.back()
    }

    pub fn len(&self) -> usize {
        self.read_history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_history.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read_history.iter().any(|k| k == key)
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.read_history.iter()
    }
}

// == LRU Strategy ==
/// Bounds a namespace by entry count, evicting the least recently read or
/// written key when a new key would exceed the ceiling.
///
/// The ceiling counts every key in the namespace, this strategy's own
/// metadata record included.
#[derive(Debug)]
pub struct LruStrategy {
    max_entries: usize,
    evicted: AtomicU64,
    /// Serializes load-modify-save of the recency list
    bookkeeping: Mutex<()>,
}

impl LruStrategy {
    // == Constructor ==
    /// Creates a strategy holding up to `capacity` cached values.
    ///
    /// One extra slot is reserved for the recency list itself.
    pub fn new(capacity: usize) -> Self {
        Self::with_max_entries(capacity.saturating_add(1))
    }

    /// Creates a strategy whose ceiling already includes the metadata record.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries,
            evicted: AtomicU64::new(0),
            bookkeeping: Mutex::new(()),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Number of cached values the strategy allows besides its metadata.
    pub fn capacity(&self) -> usize {
        self.max_entries.saturating_sub(1)
    }

    /// Number of keys removed to stay under the ceiling.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Current recency list; empty when missing or unreadable.
    pub async fn load(&self, core: &CacheCore) -> Result<LruData> {
        Ok(core.read::<LruData>(LRU_DATA_KEY).await?.unwrap_or_default())
    }

    async fn save(&self, core: &CacheCore, data: &LruData) -> Result<()> {
        core.write(LRU_DATA_KEY, data, NEVER_EXPIRES).await
    }
}

impl Default for LruStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl CacheStrategy for LruStrategy {
    fn name(&self) -> &str {
        "lru"
    }

    fn reserved_keys(&self) -> &[&str] {
        &[LRU_DATA_KEY]
    }

    fn on_init(&self, namespace: &str, _keys: &KeyBuilder, _core: &CacheCore) {
        debug!(
            "LRU strategy on '{}' with max_entries={}",
            namespace, self.max_entries
        );
    }

    async fn on_read(&self, key: &str, _item: &CachedItem<Value>, core: &CacheCore) -> Result<()> {
        let _guard = self.bookkeeping.lock().await;

        let mut data = self.load(core).await?;
        data.touch(key);
        self.save(core, &data).await
    }

    async fn on_write(&self, key: &str, _item: &CachedItem<Value>, core: &CacheCore) -> Result<()> {
        let _guard = self.bookkeeping.lock().await;

        let all_keys = core.get_all_keys().await?;
        let mut data = self.load(core).await?;

        // Overwrites do not grow the namespace
        let is_new = !all_keys.iter().any(|k| k == key);
        if is_new && all_keys.len() + 1 > self.max_entries {
            match data.evict_oldest() {
                Some(victim) => {
                    if core.evict_key(&victim).await? {
                        self.evicted.fetch_add(1, Ordering::Relaxed);
                        info!("LRU evicted '{}' to make room for '{}'", victim, key);
                    } else {
                        debug!("LRU victim '{}' was already gone", victim);
                    }
                }
                None => debug!("LRU over capacity but no tracked keys to evict"),
            }
        }

        data.touch(key);
        self.save(core, &data).await
    }

    async fn on_evict(&self, key: &str, core: &CacheCore) -> Result<()> {
        let _guard = self.bookkeeping.lock().await;

        let mut data = self.load(core).await?;
        if data.contains(key) {
            data.remove(key);
            self.save(core, &data).await?;
        }
        Ok(())
    }
}
