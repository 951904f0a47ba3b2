//! Strategy Hook Module
//!
//! Extension protocol invoked by the engine around read, write and evict.

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::{CacheCore, CachedItem, KeyBuilder};
use crate::error::Result;

// == Cache Strategy ==
/// A policy plugged into [`Cache`](crate::cache::Cache).
///
/// Hooks run sequentially in attachment order. `on_write` and `on_evict` run
/// before the storage mutation; `on_read` runs after a live (non-expired) hit.
///
/// Every hook gets the engine's [`CacheCore`], which never runs strategies,
/// so a strategy can persist its own bookkeeping without re-entering the
/// pipeline. Hooks must tolerate being called repeatedly for the same key.
#[async_trait]
pub trait CacheStrategy: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Logical keys this strategy stores its bookkeeping under.
    ///
    /// The engine keeps them out of single-key and wildcard evictions.
    fn reserved_keys(&self) -> &[&str] {
        &[]
    }

    /// Called once when the engine is constructed. Must not block.
    fn on_init(&self, _namespace: &str, _keys: &KeyBuilder, _core: &CacheCore) {}

    async fn on_read(&self, key: &str, item: &CachedItem<Value>, core: &CacheCore)
        -> Result<()>;

    async fn on_write(
        &self,
        key: &str,
        item: &CachedItem<Value>,
        core: &CacheCore,
    ) -> Result<()>;

    async fn on_evict(&self, key: &str, core: &CacheCore) -> Result<()>;
}
