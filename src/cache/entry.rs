//! Cached Item Module
//!
//! Defines the persisted envelope for cached values with TTL support.

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// `expires_at` / TTL sentinel meaning "never expires".
pub const NEVER_EXPIRES: i64 = -1;

// == Cached Item ==
/// Envelope persisted for every cache entry.
///
/// Serialized as `{"expiresAt": <i64>, "data": <T>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedItem<T> {
    /// Expiration timestamp (Unix milliseconds), or [`NEVER_EXPIRES`]
    pub expires_at: i64,
    /// The stored value
    pub data: T,
}

impl<T> CachedItem<T> {
    // == Constructor ==
    /// Creates a new item expiring `ttl_seconds` from now.
    ///
    /// # Arguments
    /// * `data` - The value to store
    /// * `ttl_seconds` - TTL in seconds, or [`NEVER_EXPIRES`]
    ///
    /// # Errors
    /// [`CacheError::InvalidTtl`] when the TTL is negative and not the sentinel.
    pub fn new(data: T, ttl_seconds: i64) -> Result<Self> {
        validate_ttl(ttl_seconds)?;
        let expires_at = if ttl_seconds == NEVER_EXPIRES {
            NEVER_EXPIRES
        } else {
            current_timestamp_ms().saturating_add(ttl_seconds.saturating_mul(1000))
        };

        Ok(Self { data, expires_at })
    }

    // == Is Expired ==
    /// Checks if the item has expired.
    ///
    /// An item expires strictly after its `expires_at` instant; the sentinel
    /// never expires.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Same as [`is_expired`](Self::is_expired) against an explicit clock reading.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at != NEVER_EXPIRES && self.expires_at < now_ms
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if the item never expires.
    pub fn ttl_remaining_ms(&self) -> Option<i64> {
        if self.expires_at == NEVER_EXPIRES {
            return None;
        }
        Some((self.expires_at - current_timestamp_ms()).max(0))
    }
}

// == Utility Functions ==
/// Rejects TTLs below zero other than [`NEVER_EXPIRES`].
pub fn validate_ttl(ttl_seconds: i64) -> Result<()> {
    if ttl_seconds < 0 && ttl_seconds != NEVER_EXPIRES {
        return Err(CacheError::InvalidTtl(ttl_seconds));
    }
    Ok(())
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
