//! Cache Factory
//!
//! Builder wiring a namespace, a backend and an ordered strategy list into one
//! engine instance.

use std::sync::Arc;

use tracing::info;

use crate::cache::{Cache, CacheStrategy, KeyMatching, LruStrategy};
use crate::config::Config;
use crate::storage::{FileBackend, MemoryBackend, StorageBackend};

/// Namespace used when none is set.
pub const DEFAULT_NAMESPACE: &str = "@cache";

// == Cache Factory ==
/// Accumulates engine settings and creates the engine once.
///
/// The factory is an ordinary value: whoever owns it hands the resulting
/// `Arc<Cache>` to the components that need caching.
///
/// # Example
/// ```ignore
/// let mut factory = CacheFactory::new();
/// factory
///     .set_namespace("@users")
///     .attach_strategy(Arc::new(LruStrategy::new(500)));
/// let cache = factory.create();
/// ```
pub struct CacheFactory {
    namespace: String,
    backend: Option<Arc<dyn StorageBackend>>,
    key_matching: KeyMatching,
    strategies: Vec<Arc<dyn CacheStrategy>>,
    cache: Option<Arc<Cache>>,
}

impl CacheFactory {
    pub fn new() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            backend: None,
            key_matching: KeyMatching::default(),
            strategies: Vec::new(),
            cache: None,
        }
    }

    /// Builds a factory from configuration.
    ///
    /// Uses a [`FileBackend`] when `storage_path` is set, and attaches an
    /// [`LruStrategy`] sized to `max_entries` unless it is zero.
    pub fn from_config(config: &Config) -> Self {
        let mut factory = Self::new();
        factory
            .set_namespace(config.namespace.clone())
            .set_key_matching(config.key_matching);

        if let Some(path) = &config.storage_path {
            factory.set_backend(Arc::new(FileBackend::new(path)));
        }
        if config.max_entries > 0 {
            factory.attach_strategy(Arc::new(LruStrategy::new(config.max_entries)));
        }
        factory
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.namespace = namespace.into();
        self
    }

    /// Backend for the engine; an in-memory store when never set.
    pub fn set_backend(&mut self, backend: Arc<dyn StorageBackend>) -> &mut Self {
        self.backend = Some(backend);
        self
    }

    pub fn set_key_matching(&mut self, matching: KeyMatching) -> &mut Self {
        self.key_matching = matching;
        self
    }

    /// Appends a strategy; hooks run in attachment order.
    pub fn attach_strategy(&mut self, strategy: Arc<dyn CacheStrategy>) -> &mut Self {
        self.strategies.push(strategy);
        self
    }

    /// The engine created by [`create`](Self::create), if any.
    pub fn instance(&self) -> Option<Arc<Cache>> {
        self.cache.clone()
    }

    // == Create ==
    /// Creates the engine on first call; later calls return the same instance.
    pub fn create(&mut self) -> Arc<Cache> {
        if let Some(cache) = &self.cache {
            return cache.clone();
        }

        let backend: Arc<dyn StorageBackend> = match &self.backend {
            Some(backend) => backend.clone(),
            None => Arc::new(MemoryBackend::new()),
        };
        let cache = Arc::new(Cache::new(
            self.namespace.clone(),
            backend,
            self.key_matching,
            self.strategies.clone(),
        ));
        info!(
            "Cache created: namespace='{}', strategies={}, key_matching={}",
            self.namespace,
            self.strategies.len(),
            self.key_matching
        );

        self.cache = Some(cache.clone());
        cache
    }
}

impl Default for CacheFactory {
    fn default() -> Self {
        Self::new()
    }
}
