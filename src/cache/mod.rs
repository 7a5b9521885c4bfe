//! Cache Module
//!
//! Process-local data cache with TTL expiration, prefix invalidation and
//! per-key fetch coalescing. Each [`TtlCache`] is an independent instance:
//! nothing is shared between processes or between caches.

mod entry;
mod expiry;
mod flight;
mod key;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use expiry::ExpiryQueue;
pub use key::{CacheKey, PAGE_NAMESPACE, USER_NAMESPACE};
pub use stats::CacheStats;
pub use store::{CacheSettings, FetchOptions, TtlCache};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Default expiration for fetched values (5 minutes)
pub const DEFAULT_EXPIRATION_MS: u64 = 300_000;
