//! Memo Cache - A backend-agnostic memoization cache
//!
//! Namespaced key-value caching with TTL expiry, wildcard eviction and
//! pluggable strategies (LRU included) over any async storage backend.

pub mod cache;
pub mod config;
pub mod error;
pub mod factory;
pub mod memoize;
pub mod storage;

pub use cache::{Cache, CacheCore, CacheStrategy, KeyMatching, LruStrategy};
pub use config::Config;
pub use error::{CacheError, Result};
pub use factory::CacheFactory;
pub use memoize::{evict_then, Memoize};
