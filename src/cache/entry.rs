//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use crate::clock::duration_ms;

// == Cache Entry ==
/// A cached fetch result together with its timing metadata.
///
/// Invariant: `expires_at >= stored_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The cached value, opaque to the cache
    pub value: V,
    /// Creation timestamp (Unix milliseconds), diagnostic only
    pub stored_at: u64,
    /// Absolute expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry stored at `now_ms` that lives for `ttl`.
    pub fn new(value: V, now_ms: u64, ttl: Duration) -> Self {
        Self {
            value,
            stored_at: now_ms,
            expires_at: now_ms.saturating_add(duration_ms(ttl)),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is only fresh while `expires_at > now`, so it is expired
    /// from the exact millisecond its TTL has fully elapsed.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }
}
