//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A stored value addressed by its key hashes instead of the key itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<V> {
    /// Primary key hash, selects shard and map slot
    pub key: u64,
    /// Independent secondary hash guarding against primary collisions
    pub conflict: u64,
    /// The stored value
    pub value: V,
    /// Cost charged against the budget
    pub cost: i64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl<V> Entry<V> {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now, or never when `ttl` is zero.
    pub fn new(key: u64, conflict: u64, value: V, cost: i64, ttl: Duration) -> Self {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            Some(current_timestamp_ms().saturating_add(ttl_ms))
        };
        Self {
            key,
            conflict,
            value,
            cost,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now` (Unix milliseconds).
    ///
    /// An entry is expired once `now >= expires_at`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
