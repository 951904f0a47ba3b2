//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine and its storage backends.
#[derive(Error, Debug)]
pub enum CacheError {
    /// TTL is negative and not the "never expires" sentinel
    #[error("Invalid TTL: {0} (must be >= 0, or -1 for no expiry)")]
    InvalidTtl(i64),

    /// A value or key argument could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key rejected before reaching the backend
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
