//! Memoization Module
//!
//! Binds an async computation to a cache key: read on the way in, compute and
//! write on a miss.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::{serialize_item_keys, validate_ttl, Cache, WILDCARD_SUFFIX};
use crate::error::{CacheError, Result};

// == Memoize ==
/// Composite-key builder and read-through wrapper.
///
/// Arguments are serialized to JSON in the order they are added, so
/// `sum(1, 2)` and `sum(2, 1)` are different entries.
///
/// # Example
/// ```ignore
/// let total = Memoize::new(&cache, "sum", 60)
///     .arg(&a)?
///     .arg(&b)?
///     .get_or_compute(|| async { a + b })
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Memoize<'a> {
    cache: &'a Cache,
    key: String,
    ttl: i64,
    args: Vec<String>,
}

impl<'a> Memoize<'a> {
    /// # Arguments
    /// * `cache` - Engine holding the results
    /// * `key` - Logical key shared by every call of the computation
    /// * `ttl` - Seconds results stay valid, or `-1` for no expiry
    pub fn new(cache: &'a Cache, key: impl Into<String>, ttl: i64) -> Self {
        Self {
            cache,
            key: key.into(),
            ttl,
            args: Vec::new(),
        }
    }

    /// Adds one key argument.
    pub fn arg<A: Serialize + ?Sized>(mut self, arg: &A) -> Result<Self> {
        self.args.push(serde_json::to_string(arg)?);
        Ok(self)
    }

    /// The composite key, before namespacing.
    pub fn key(&self) -> String {
        serialize_item_keys(&self.key, &self.args)
    }

    fn checked_key(&self) -> Result<String> {
        validate_ttl(self.ttl)?;
        if self.key.is_empty() {
            return Err(CacheError::InvalidKey("logical key is empty".to_string()));
        }
        let key = self.key();
        if key.ends_with(WILDCARD_SUFFIX) {
            return Err(CacheError::InvalidKey(format!(
                "'{}' would be read as an eviction pattern",
                key
            )));
        }
        Ok(key)
    }

    // == Get Or Compute ==
    /// Returns the cached result, or awaits `compute` and caches its output.
    pub async fn get_or_compute<T, F, Fut>(self, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let key = self.checked_key()?;
        if let Some(hit) = self.cache.read::<T>(&key).await? {
            return Ok(hit);
        }

        debug!("Computing '{}'", key);
        let value = compute().await;
        self.cache.write(&key, &value, self.ttl).await?;
        Ok(value)
    }

    /// Like [`get_or_compute`](Self::get_or_compute) for fallible work.
    ///
    /// Errors from `compute` are returned as-is and never cached.
    pub async fn try_get_or_compute<T, E, F, Fut>(self, compute: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = self.checked_key()?;
        if let Some(hit) = self.cache.read::<T>(&key).await? {
            return Ok(hit);
        }

        debug!("Computing '{}'", key);
        let value = compute().await?;
        self.cache.write(&key, &value, self.ttl).await?;
        Ok(value)
    }
}

// == Evict Then ==
/// Evicts `key` (a `"prefix:*"` pattern is allowed), then awaits `operation`.
///
/// Used in front of mutations that invalidate cached reads.
pub async fn evict_then<T, F, Fut>(cache: &Cache, key: &str, operation: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    let removed = cache.evict(key).await?;
    debug!("Evicted '{}' before operation (removed={})", key, removed);
    Ok(operation().await)
}
