//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::cache::{KeyMatching, DEFAULT_CAPACITY};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace prefixed to every storage key
    pub namespace: String,
    /// Usable LRU capacity (0 disables the LRU strategy)
    pub max_entries: usize,
    /// Default TTL in seconds used by callers that do not pick one
    pub default_ttl: i64,
    /// JSON file used as the backend; in-memory when unset
    pub storage_path: Option<PathBuf>,
    /// How namespace filtering and wildcard eviction match keys
    pub key_matching: KeyMatching,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_NAMESPACE` - Key namespace (default: "@cache")
    /// - `CACHE_MAX_ENTRIES` - Usable LRU capacity (default: 1000)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_STORAGE_PATH` - File backend path (default: in-memory)
    /// - `CACHE_KEY_MATCHING` - `prefix` or `substring` (default: prefix)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            namespace: env::var("CACHE_NAMESPACE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.namespace),
            max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_entries),
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl),
            storage_path: env::var("CACHE_STORAGE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            key_matching: env::var("CACHE_KEY_MATCHING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.key_matching),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: "@cache".to_string(),
            max_entries: DEFAULT_CAPACITY,
            default_ttl: 300,
            storage_path: None,
            key_matching: KeyMatching::Prefix,
        }
    }
}
