//! Cache Module
//!
//! Namespaced TTL cache engine, its strategy hook protocol and the LRU
//! strategy.

mod engine;
mod entry;
mod keys;
mod lru;
mod stats;
mod strategy;


// Re-export public types
pub use engine::{Cache, CacheCore};
pub use entry::{current_timestamp_ms, validate_ttl, CachedItem, NEVER_EXPIRES};
pub use keys::{serialize_item_keys, KeyBuilder, KeyMatching, WILDCARD_SUFFIX};
pub use lru::{LruData, LruStrategy, DEFAULT_CAPACITY, LRU_DATA_KEY};
pub use stats::CacheStats;
pub use strategy::CacheStrategy;
