//! Cache Engine Module
//!
//! Namespaced, TTL-aware cache over a [`StorageBackend`], with a pipeline of
//! [`CacheStrategy`] hooks around every read, write and evict.

use std::collections::HashSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::keys::serialize_item_keys;
use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheStats, CacheStrategy, CachedItem, KeyBuilder, KeyMatching};
use crate::error::Result;
use crate::storage::{Storage, StorageBackend};

// == Cache Core ==
/// Strategy-free view of a cache namespace.
///
/// Every operation here skips the strategy pipeline. Strategies receive this
/// view in their hooks to persist bookkeeping; callers reach it through
/// [`Cache::bypass`].
#[derive(Debug)]
pub struct CacheCore {
    keys: KeyBuilder,
    storage: Storage,
}

impl CacheCore {
    pub fn new(keys: KeyBuilder, backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            keys,
            storage: Storage::new(backend),
        }
    }

    pub fn namespace(&self) -> &str {
        self.keys.namespace()
    }

    pub fn key_builder(&self) -> &KeyBuilder {
        &self.keys
    }

    /// Prefixes `key` with the namespace unless it already carries it.
    pub fn create_storage_key(&self, key: &str) -> String {
        self.keys.storage_key(key)
    }

    // == Fetch ==
    /// Loads the envelope under an already-namespaced key.
    ///
    /// Missing, malformed and expired items all come back as `None`. Expired
    /// payloads are left in storage.
    pub async fn fetch(&self, storage_key: &str) -> Result<Option<CachedItem<Value>>> {
        let Some(item) = self.storage.get::<CachedItem<Value>>(storage_key).await? else {
            return Ok(None);
        };
        if item.is_expired() {
            debug!("Key '{}' expired at {}", storage_key, item.expires_at);
            return Ok(None);
        }
        Ok(Some(item))
    }

    /// Persists an envelope under an already-namespaced key.
    pub async fn store(&self, storage_key: &str, item: &CachedItem<Value>) -> Result<()> {
        self.storage.store(storage_key, item).await
    }

    // == Read ==
    /// Reads `key` without running strategies.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let storage_key = self.create_storage_key(key);
        match self.fetch(&storage_key).await? {
            Some(item) => Ok(decode(&storage_key, item.data)),
            None => Ok(None),
        }
    }

    // == Write ==
    /// Writes `key` without running strategies.
    pub async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: i64) -> Result<()> {
        let item = CachedItem::new(serde_json::to_value(value)?, ttl)?;
        self.store(&self.create_storage_key(key), &item).await
    }

    // == Evict ==
    /// Evicts `key` (or a `"prefix:*"` pattern) without running strategies.
    pub async fn evict(&self, key: &str) -> Result<bool> {
        if let Some(prefix) = self.keys.pattern_prefix(key) {
            let matched = self.keys_matching(&prefix).await?;
            for storage_key in &matched {
                self.storage.delete(storage_key).await?;
            }
            return Ok(!matched.is_empty());
        }
        self.evict_key(key).await
    }

    /// Deletes exactly one key, never interpreting it as a pattern.
    pub async fn evict_key(&self, key: &str) -> Result<bool> {
        self.storage.delete(&self.create_storage_key(key)).await
    }

    // == Key Enumeration ==
    /// All backend keys that belong to this namespace.
    pub async fn get_all_keys(&self) -> Result<Vec<String>> {
        let keys = self.storage.get_all_keys().await?;
        Ok(keys.into_iter().filter(|k| self.keys.owns(k)).collect())
    }

    /// Namespaced keys selected by a namespaced pattern prefix.
    async fn keys_matching(&self, prefix: &str) -> Result<Vec<String>> {
        let keys = self.get_all_keys().await?;
        Ok(keys
            .into_iter()
            .filter(|k| self.keys.pattern_matches(k, prefix))
            .collect())
    }

    // == Flush ==
    /// Removes every key of this namespace in one batch; returns how many.
    pub async fn flush(&self) -> Result<usize> {
        let keys = self.get_all_keys().await?;
        self.storage.multi_remove(&keys).await?;
        Ok(keys.len())
    }
}

fn decode<T: DeserializeOwned>(storage_key: &str, data: Value) -> Option<T> {
    match serde_json::from_value(data) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Cached value under '{}' has an unexpected shape: {}", storage_key, e);
            None
        }
    }
}

// == Cache ==
/// The cache engine: a [`CacheCore`] plus an ordered strategy pipeline.
pub struct Cache {
    core: CacheCore,
    strategies: Vec<Arc<dyn CacheStrategy>>,
    /// Storage keys owned by strategies; never evicted through the pipeline
    reserved: HashSet<String>,
    stats: StatsRecorder,
}

impl Cache {
    // == Constructor ==
    /// Creates an engine and calls `on_init` on each strategy, in order.
    ///
    /// # Arguments
    /// * `namespace` - Prefix scoping every key this engine owns
    /// * `backend` - Raw key-value store
    /// * `matching` - Namespace/pattern matching mode
    /// * `strategies` - Hooks, invoked in this order
    pub fn new(
        namespace: impl Into<String>,
        backend: Arc<dyn StorageBackend>,
        matching: KeyMatching,
        strategies: Vec<Arc<dyn CacheStrategy>>,
    ) -> Self {
        let keys = KeyBuilder::new(namespace, matching);
        let core = CacheCore::new(keys, backend);

        let mut reserved = HashSet::new();
        for strategy in &strategies {
            reserved.extend(
                strategy
                    .reserved_keys()
                    .iter()
                    .map(|key| core.create_storage_key(key)),
            );
            strategy.on_init(core.namespace(), core.key_builder(), &core);
            debug!(
                "Strategy '{}' attached to namespace '{}'",
                strategy.name(),
                core.namespace()
            );
        }

        Self {
            core,
            strategies,
            reserved,
            stats: StatsRecorder::default(),
        }
    }

    pub fn namespace(&self) -> &str {
        self.core.namespace()
    }

    /// Strategy-free access to the same namespace.
    pub fn bypass(&self) -> &CacheCore {
        &self.core
    }

    pub fn create_storage_key(&self, key: &str) -> String {
        self.core.create_storage_key(key)
    }

    /// Appends serialized call arguments to a logical key with `_`.
    pub fn serialize_item_keys<S: AsRef<str>>(&self, base: &str, args: &[S]) -> String {
        serialize_item_keys(base, args)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Read ==
    /// Returns the live value under `key`, or `None` if missing or expired.
    ///
    /// On a hit, every strategy's `on_read` runs before the value is returned.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let storage_key = self.create_storage_key(key);

        let Some(item) = self.core.fetch(&storage_key).await? else {
            self.stats.record_miss();
            debug!("Cache miss: {}", storage_key);
            return Ok(None);
        };

        for strategy in &self.strategies {
            strategy.on_read(&storage_key, &item, &self.core).await?;
        }

        let Some(value) = decode(&storage_key, item.data) else {
            self.stats.record_miss();
            return Ok(None);
        };

        self.stats.record_hit();
        debug!("Cache hit: {}", storage_key);
        Ok(Some(value))
    }

    // == Write ==
    /// Stores `value` under `key` for `ttl` seconds (`-1` = never expires).
    ///
    /// # Errors
    /// [`CacheError::InvalidTtl`](crate::error::CacheError::InvalidTtl) when
    /// `ttl < 0` and `ttl != -1`; nothing is written and no strategy runs.
    pub async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: i64) -> Result<()> {
        let item = CachedItem::new(serde_json::to_value(value)?, ttl)?;
        let storage_key = self.create_storage_key(key);

        for strategy in &self.strategies {
            strategy.on_write(&storage_key, &item, &self.core).await?;
        }

        self.core.store(&storage_key, &item).await?;
        self.stats.record_write();
        debug!("Cache write: {} (ttl={}s)", storage_key, ttl);
        Ok(())
    }

    // == Evict ==
    /// Removes `key`, or every key matched by a `"prefix:*"` pattern.
    ///
    /// Returns whether anything was removed (for patterns: whether any key
    /// matched). Strategy metadata keys are never matched; use [`flush`](Self::flush)
    /// or [`bypass`](Self::bypass) to remove them.
    pub async fn evict(&self, key: &str) -> Result<bool> {
        if let Some(prefix) = self.core.keys.pattern_prefix(key) {
            return self.evict_pattern(&prefix).await;
        }

        let storage_key = self.create_storage_key(key);
        if self.is_reserved(&storage_key) {
            warn!("Refusing to evict strategy metadata key '{}'", storage_key);
            return Ok(false);
        }
        self.evict_storage_key(&storage_key).await
    }

    /// Returns true if `storage_key` holds strategy bookkeeping.
    pub fn is_reserved(&self, storage_key: &str) -> bool {
        self.reserved.contains(storage_key)
    }

    async fn evict_storage_key(&self, storage_key: &str) -> Result<bool> {
        for strategy in &self.strategies {
            strategy.on_evict(storage_key, &self.core).await?;
        }

        let removed = self.core.storage.delete(storage_key).await?;
        if removed {
            self.stats.record_eviction();
        }
        debug!("Cache evict: {} (removed={})", storage_key, removed);
        Ok(removed)
    }

    async fn evict_pattern(&self, prefix: &str) -> Result<bool> {
        let mut matched = self.core.keys_matching(prefix).await?;
        matched.retain(|k| !self.is_reserved(k));
        if matched.is_empty() {
            debug!("Pattern '{}' matched no keys", prefix);
            return Ok(false);
        }

        for storage_key in &matched {
            self.evict_storage_key(storage_key).await?;
        }
        info!("Pattern '{}' evicted {} keys", prefix, matched.len());
        Ok(true)
    }

    // == Flush ==
    /// Removes every key under this namespace, strategy metadata included.
    pub async fn flush(&self) -> Result<()> {
        let removed = self.core.flush().await?;
        info!("Flushed {} keys from namespace '{}'", removed, self.namespace());
        Ok(())
    }

    /// All storage keys under this namespace.
    pub async fn get_all_keys(&self) -> Result<Vec<String>> {
        self.core.get_all_keys().await
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("namespace", &self.namespace())
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NEVER_EXPIRES;
    use crate::error::CacheError;
    use crate::storage::MemoryBackend;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every hook call as "<name>:<hook>:<key>".
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn push(&self, hook: &str, key: &str) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}:{}", self.name, hook, key));
        }
    }

    #[async_trait]
    impl CacheStrategy for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn on_init(&self, namespace: &str, _keys: &KeyBuilder, _core: &CacheCore) {
            self.push("init", namespace);
        }

        async fn on_read(&self, key: &str, _: &CachedItem<Value>, _: &CacheCore) -> Result<()> {
            tokio::task::yield_now().await;
            self.push("read", key);
            Ok(())
        }

        async fn on_write(&self, key: &str, _: &CachedItem<Value>, core: &CacheCore) -> Result<()> {
            // Bookkeeping through the core never re-enters the pipeline
            core.write(&format!("meta-{}", self.name), key, NEVER_EXPIRES)
                .await?;
            self.push("write", key);
            Ok(())
        }

        async fn on_evict(&self, key: &str, _: &CacheCore) -> Result<()> {
            self.push("evict", key);
            Ok(())
        }
    }

    fn plain_cache(namespace: &str) -> (Arc<MemoryBackend>, Cache) {
        let backend = Arc::new(MemoryBackend::new());
        let cache = Cache::new(namespace, backend.clone(), KeyMatching::Prefix, Vec::new());
        (backend, cache)
    }

    fn recorded_cache() -> (Arc<Mutex<Vec<String>>>, Cache) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let strategies: Vec<Arc<dyn CacheStrategy>> = vec![
            Arc::new(Recorder {
                name: "first",
                log: log.clone(),
            }),
            Arc::new(Recorder {
                name: "second",
                log: log.clone(),
            }),
        ];
        let cache = Cache::new(
            "@T",
            Arc::new(MemoryBackend::new()),
            KeyMatching::Prefix,
            strategies,
        );
        (log, cache)
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (_, cache) = plain_cache("@T");

        cache.write("k", &42, 10).await.unwrap();
        assert_eq!(cache.read::<i32>("k").await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_read_missing() {
        let (_, cache) = plain_cache("@T");
        assert_eq!(cache.read::<i32>("missing").await.unwrap(), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_ttl_expiry_is_lazy() {
        let (backend, cache) = plain_cache("@T");
        cache.write("k", &42, 1).await.unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(cache.read::<i32>("k").await.unwrap(), Some(42));

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(cache.read::<i32>("k").await.unwrap(), None);

        // Expired payload stays in storage until evicted or overwritten
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_never_expires() {
        let (_, cache) = plain_cache("@T");
        cache.write("k", "forever", NEVER_EXPIRES).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(
            cache.read::<String>("k").await.unwrap(),
            Some("forever".to_string())
        );
    }

    #[tokio::test]
    async fn test_invalid_ttl_rejected_before_strategies() {
        let (log, cache) = recorded_cache();

        let result = cache.write("k", &1, -2).await;

        assert!(matches!(result, Err(CacheError::InvalidTtl(-2))));
        assert!(cache.get_all_keys().await.unwrap().is_empty());
        assert!(!log.lock().unwrap().iter().any(|l| l.contains(":write:")));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let (_, cache) = plain_cache("@T");
        cache.write("k", &1, 60).await.unwrap();
        cache.write("k", &2, 60).await.unwrap();

        assert_eq!(cache.read::<i32>("k").await.unwrap(), Some(2));
        assert_eq!(cache.get_all_keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_read_wrong_type_is_none() {
        let (_, cache) = plain_cache("@T");
        cache.write("k", "text", 60).await.unwrap();

        assert_eq!(cache.read::<u64>("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_evict_single_key() {
        let (_, cache) = plain_cache("@T");
        cache.write("k", &1, NEVER_EXPIRES).await.unwrap();

        assert!(cache.evict("k").await.unwrap());
        assert_eq!(cache.read::<i32>("k").await.unwrap(), None);
        assert!(!cache.evict("k").await.unwrap());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_evict_pattern() {
        let (_, cache) = plain_cache("@T");
        cache.write("sum_1_1", &2, 60).await.unwrap();
        cache.write("sum_1_2", &3, 60).await.unwrap();
        cache.write("other", &0, 60).await.unwrap();

        assert!(cache.evict("sum:*").await.unwrap());
        assert_eq!(cache.read::<i32>("sum_1_1").await.unwrap(), None);
        assert_eq!(cache.read::<i32>("sum_1_2").await.unwrap(), None);
        assert_eq!(cache.read::<i32>("other").await.unwrap(), Some(0));

        assert!(!cache.evict("sum:*").await.unwrap());
    }

    #[tokio::test]
    async fn test_evict_pattern_on_empty_namespace() {
        let (_, cache) = plain_cache("@T");
        assert!(!cache.evict("anything:*").await.unwrap());
    }

    #[tokio::test]
    async fn test_evict_pattern_prefix_vs_substring() {
        let backend = Arc::new(MemoryBackend::new());
        let anchored = Cache::new("@T", backend.clone(), KeyMatching::Prefix, Vec::new());
        let legacy = Cache::new("@T", backend.clone(), KeyMatching::Substring, Vec::new());

        // A foreign key that happens to embed "@T:sum"
        backend
            .set_item("@Other:@T:sum_1", r#"{"expiresAt":-1,"data":1}"#.to_string())
            .await
            .unwrap();

        assert!(!anchored.evict("sum:*").await.unwrap());
        assert_eq!(backend.len().await, 1);

        assert!(legacy.evict("sum:*").await.unwrap());
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_flush_scoped_to_namespace() {
        let backend = Arc::new(MemoryBackend::new());
        let a = Cache::new("@A", backend.clone(), KeyMatching::Prefix, Vec::new());
        let b = Cache::new("@AB", backend.clone(), KeyMatching::Prefix, Vec::new());

        a.write("k1", &1, 60).await.unwrap();
        a.write("k2", &2, 60).await.unwrap();
        b.write("k1", &10, 60).await.unwrap();

        a.flush().await.unwrap();

        assert!(a.get_all_keys().await.unwrap().is_empty());
        assert_eq!(b.read::<i32>("k1").await.unwrap(), Some(10));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_all_keys_filters_namespace() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_item("foreign", "{}".to_string()).await.unwrap();
        let cache = Cache::new("@T", backend, KeyMatching::Prefix, Vec::new());
        cache.write("k", &1, 60).await.unwrap();

        assert_eq!(cache.get_all_keys().await.unwrap(), vec!["@T:k".to_string()]);
    }

    #[tokio::test]
    async fn test_strategies_run_in_attachment_order() {
        let (log, cache) = recorded_cache();

        cache.write("k", &1, 60).await.unwrap();
        cache.read::<i32>("k").await.unwrap();
        cache.evict("k").await.unwrap();

        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "first:init:@T",
                "second:init:@T",
                "first:write:@T:k",
                "second:write:@T:k",
                "first:read:@T:k",
                "second:read:@T:k",
                "first:evict:@T:k",
                "second:evict:@T:k",
            ]
        );
    }

    #[tokio::test]
    async fn test_read_hooks_skipped_on_miss() {
        let (log, cache) = recorded_cache();
        cache.read::<i32>("missing").await.unwrap();

        assert!(!log.lock().unwrap().iter().any(|l| l.contains(":read:")));
    }

    #[tokio::test]
    async fn test_pattern_evict_runs_hooks_per_key() {
        let (log, cache) = recorded_cache();
        cache.write("sum_1", &1, 60).await.unwrap();
        cache.write("sum_2", &2, 60).await.unwrap();

        assert!(cache.evict("sum:*").await.unwrap());

        let evicts = log
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.contains(":evict:"))
            .count();
        assert_eq!(evicts, 4);
    }

    #[tokio::test]
    async fn test_bypass_skips_strategies() {
        let (log, cache) = recorded_cache();
        let before = log.lock().unwrap().len();

        cache.bypass().write("k", &1, 60).await.unwrap();
        assert_eq!(cache.bypass().read::<i32>("k").await.unwrap(), Some(1));
        assert!(cache.bypass().evict("k").await.unwrap());

        assert_eq!(log.lock().unwrap().len(), before);
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_serialize_item_keys() {
        let (_, cache) = plain_cache("@T");
        assert_eq!(cache.serialize_item_keys("sum", &["1", "2"]), "sum_1_2");
        assert_eq!(cache.create_storage_key("sum_1_2"), "@T:sum_1_2");
    }
}
