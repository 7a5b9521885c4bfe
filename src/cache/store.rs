//! Cache Store Module
//!
//! The TTL cache engine: get-or-fetch over caller-supplied async fetches,
//! lazy expiry, key/prefix invalidation and in-place updates.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::flight::FlightRegistry;
use crate::cache::{CacheEntry, CacheKey, CacheStats, ExpiryQueue, DEFAULT_EXPIRATION_MS};
use crate::clock::{Clock, SystemClock};

// == Settings ==
/// Construction-time parameters of a [`TtlCache`].
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Maximum number of entries; inserting a new key beyond it evicts the
    /// entry with the oldest expiry
    pub max_entries: usize,
    /// Expiration used when [`FetchOptions::expiration`] is `None`
    pub default_ttl: Duration,
    /// Coalesce concurrent misses for the same key into a single fetch
    pub dedupe_fetches: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            default_ttl: Duration::from_millis(DEFAULT_EXPIRATION_MS),
            dedupe_fetches: true,
        }
    }
}

// == Fetch Options ==
/// Per-call options for [`TtlCache::get_or_fetch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Lifetime of the stored value; `None` uses the cache default
    pub expiration: Option<Duration>,
    /// Always fetch, ignoring any fresh entry (the result is still stored)
    pub bypass_cache: bool,
}

impl FetchOptions {
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn bypassing_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }
}

// == Cache State ==
#[derive(Debug)]
struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    expiry: ExpiryQueue,
    stats: CacheStats,
}

impl<V: Clone> CacheState<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            expiry: ExpiryQueue::new(),
            stats: CacheStats::new(),
        }
    }

    fn fresh_value(&self, key: &str, now_ms: u64) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now_ms))
            .map(|entry| entry.value.clone())
    }

    fn insert(&mut self, key: &str, entry: CacheEntry<V>, max_entries: usize) {
        if let Some(previous) = self.entries.get(key) {
            let previous_expiry = previous.expires_at;
            self.expiry.remove(key, previous_expiry);
        } else {
            while self.entries.len() >= max_entries.max(1) {
                let Some(evicted) = self.expiry.pop_oldest() else {
                    break;
                };
                self.entries.remove(&evicted);
                self.stats.record_eviction();
                debug!(key = %evicted, "Evicted cache entry");
            }
        }

        self.expiry.insert(key, entry.expires_at);
        self.entries.insert(key.to_string(), entry);
        self.stats.set_total_entries(self.entries.len());
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let removed = self.entries.remove(key)?;
        self.expiry.remove(key, removed.expires_at);
        self.stats.set_total_entries(self.entries.len());
        Some(removed)
    }
}

// == TTL Cache ==
/// Process-local cache over asynchronous fetches.
///
/// Construct one per application and share it by `Arc`. Instances never
/// see each other's entries, so in a multi-process deployment a write on one
/// process is invisible to the others.
///
/// Expiry is lazy: an entry may linger in the map after it expires and is
/// simply treated as absent until it is overwritten, invalidated, evicted or
/// removed by [`purge_expired`](Self::purge_expired).
#[derive(Debug)]
pub struct TtlCache<V> {
    state: RwLock<CacheState<V>>,
    flights: FlightRegistry,
    settings: CacheSettings,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    // == Constructor ==
    pub fn new(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(CacheState::new()),
            flights: FlightRegistry::new(),
            settings,
            clock,
        }
    }

    /// Creates a cache that reads wall-clock time.
    pub fn with_system_clock(settings: CacheSettings) -> Self {
        Self::new(settings, Arc::new(SystemClock))
    }

    // == Get Or Fetch ==
    /// Returns the fresh cached value for `key`, or runs `fetch` and caches
    /// its result.
    ///
    /// - A fresh entry (`expires_at > now`) is returned without calling
    ///   `fetch`, unless `options.bypass_cache` is set.
    /// - A failed fetch is returned verbatim and nothing is written, so the
    ///   next call retries.
    /// - A successful fetch overwrites any previous entry for `key` and lives
    ///   for `options.expiration` (or the cache default).
    ///
    /// With `dedupe_fetches` enabled, concurrent misses on one key queue
    /// behind the first caller's fetch and reuse its result. A caller queued
    /// behind a failed fetch runs its own. With it disabled, racing callers
    /// each fetch and the last write wins.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &CacheKey,
        fetch: F,
        options: FetchOptions,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let ttl = options.expiration.unwrap_or(self.settings.default_ttl);

        if options.bypass_cache {
            debug!(key = %key, "Cache bypassed");
            return self.fetch_and_store(key, fetch, ttl).await;
        }

        if let Some(value) = self.get(key.as_str()).await {
            return Ok(value);
        }

        if !self.settings.dedupe_fetches {
            return self.fetch_and_store(key, fetch, ttl).await;
        }

        let _flight = self.flights.join(key.as_str()).await;

        // Filled by the caller we queued behind.
        let now = self.clock.now_ms();
        {
            let mut state = self.state.write().await;
            if let Some(value) = state.fresh_value(key.as_str(), now) {
                state.stats.record_coalesced();
                debug!(key = %key, "Reused in-flight fetch result");
                return Ok(value);
            }
        }

        self.fetch_and_store(key, fetch, ttl).await
    }

    async fn fetch_and_store<F, Fut, E>(
        &self,
        key: &CacheKey,
        fetch: F,
        ttl: Duration,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.state.write().await.stats.record_fetch();

        match fetch().await {
            Ok(value) => {
                let entry = CacheEntry::new(value.clone(), self.clock.now_ms(), ttl);
                let mut state = self.state.write().await;
                state.insert(key.as_str(), entry, self.settings.max_entries);
                debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Cached fetch result");
                Ok(value)
            }
            Err(err) => {
                self.state.write().await.stats.record_fetch_failure();
                debug!(key = %key, "Fetch failed, nothing cached");
                Err(err)
            }
        }
    }

    // == Get ==
    /// Returns the value for `key` if present and fresh.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let mut state = self.state.write().await;

        match state.fresh_value(key, now) {
            Some(value) => {
                state.stats.record_hit();
                debug!(key, "Cache hit");
                Some(value)
            }
            None => {
                state.stats.record_miss();
                debug!(key, "Cache miss");
                None
            }
        }
    }

    // == Invalidate ==
    /// Removes the entry for `key`. Returns whether one was present.
    pub async fn invalidate(&self, key: &str) -> bool {
        let mut state = self.state.write().await;
        let removed = state.remove(key).is_some();
        if removed {
            state.stats.record_invalidations(1);
            debug!(key, "Invalidated cache entry");
        }
        removed
    }

    // == Invalidate By Prefix ==
    /// Removes every entry whose key starts with `prefix` (case-sensitive).
    /// Returns the number of entries removed.
    pub async fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        let mut state = self.state.write().await;
        let matching: Vec<String> = state
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        for key in &matching {
            state.remove(key);
        }

        state.stats.record_invalidations(matching.len());
        debug!(prefix, removed = matching.len(), "Invalidated cache prefix");
        matching.len()
    }

    // == Clear ==
    /// Removes all entries. Returns the number of entries removed.
    pub async fn clear(&self) -> usize {
        let mut state = self.state.write().await;
        let removed = state.entries.len();

        state.entries.clear();
        state.expiry.clear();
        state.stats.record_invalidations(removed);
        state.stats.set_total_entries(0);
        debug!(removed, "Cleared cache");
        removed
    }

    // == Update ==
    /// Patches the value stored for `key` in place, keeping its expiry.
    ///
    /// Applies to expired-but-present entries too. Returns `false` without
    /// calling `update` when the key is absent.
    pub async fn update<F>(&self, key: &str, update: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        let mut state = self.state.write().await;
        match state.entries.get_mut(key) {
            Some(entry) => {
                update(&mut entry.value);
                debug!(key, "Updated cache entry in place");
                true
            }
            None => false,
        }
    }

    // == Peek Entry ==
    /// Returns a copy of the raw entry for `key`, expired or not.
    pub async fn entry(&self, key: &str) -> Option<CacheEntry<V>> {
        self.state.read().await.entries.get(key).cloned()
    }

    // == Purge Expired ==
    /// Removes all expired entries. Returns the number of entries removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut state = self.state.write().await;
        let expired = state.expiry.drain_expired(now);

        for key in &expired {
            state.entries.remove(key);
        }

        let total = state.entries.len();
        state.stats.set_total_entries(total);
        expired.len()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.entries.len());
        stats
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet
    /// removed.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.flights.len()
    }
}
