//! Expiry Queue Module
//!
//! Orders keys by absolute expiry so the cache can evict oldest-expiry-first
//! and purge expired entries without scanning the whole map.

use std::collections::BTreeSet;

// == Expiry Queue ==
/// Tracks `(expires_at, key)` pairs in ascending order.
///
/// - Front = earliest expiry (evicted first)
/// - Back = latest expiry
///
/// Ties on `expires_at` are broken by key order.
#[derive(Debug, Default)]
pub struct ExpiryQueue {
    order: BTreeSet<(u64, String)>,
}

impl ExpiryQueue {
    // == Constructor ==
    /// Creates a new empty expiry queue.
    pub fn new() -> Self {
        Self {
            order: BTreeSet::new(),
        }
    }

    // == Insert ==
    /// Records that `key` expires at `expires_at`.
    ///
    /// Callers must [`remove`](Self::remove) the previous expiry of an
    /// overwritten key first.
    pub fn insert(&mut self, key: &str, expires_at: u64) {
        self.order.insert((expires_at, key.to_string()));
    }

    // == Remove ==
    /// Removes a key tracked under `expires_at`.
    pub fn remove(&mut self, key: &str, expires_at: u64) {
        self.order.remove(&(expires_at, key.to_string()));
    }

    // == Pop Oldest ==
    /// Returns and removes the key with the earliest expiry.
    pub fn pop_oldest(&mut self) -> Option<String> {
        self.order.pop_first().map(|(_, key)| key)
    }

    // == Drain Expired ==
    /// Removes and returns every key with `expires_at <= now_ms`.
    pub fn drain_expired(&mut self, now_ms: u64) -> Vec<String> {
        let mut expired = Vec::new();
        while let Some((expires_at, _)) = self.order.first() {
            if *expires_at > now_ms {
                break;
            }
            if let Some((_, key)) = self.order.pop_first() {
                expired.push(key);
            }
        }
        expired
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.order.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
