//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheSettings;
use crate::preview::PreviewSettings;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Maximum number of entries the data cache can hold
    pub cache_max_entries: usize,
    /// Default cache TTL in milliseconds
    pub cache_default_ttl_ms: u64,
    /// Coalesce concurrent misses for the same key into one fetch
    pub cache_dedupe_fetches: bool,
    /// Preview lifetime in seconds
    pub preview_ttl_secs: u64,
    /// Maximum number of live previews
    pub preview_max_entries: usize,
    /// Background cleanup task interval in seconds
    pub cleanup_interval_secs: u64,
    /// Bearer token to subject id, for the static authenticator
    pub auth_tokens: HashMap<String, String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10000)
    /// - `CACHE_DEFAULT_TTL_MS` - Default cache TTL in ms (default: 300000)
    /// - `CACHE_DEDUPE_FETCHES` - Coalesce concurrent fetches (default: true)
    /// - `PREVIEW_TTL_SECS` - Preview lifetime in seconds (default: 1800)
    /// - `PREVIEW_MAX_ENTRIES` - Maximum live previews (default: 1000)
    /// - `CLEANUP_INTERVAL_SECS` - Cleanup frequency in seconds (default: 60)
    /// - `AUTH_TOKENS` - `token=subject` pairs separated by commas (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", defaults.cache_max_entries),
            cache_default_ttl_ms: env_or("CACHE_DEFAULT_TTL_MS", defaults.cache_default_ttl_ms),
            cache_dedupe_fetches: env_or("CACHE_DEDUPE_FETCHES", defaults.cache_dedupe_fetches),
            preview_ttl_secs: env_or("PREVIEW_TTL_SECS", defaults.preview_ttl_secs),
            preview_max_entries: env_or("PREVIEW_MAX_ENTRIES", defaults.preview_max_entries),
            cleanup_interval_secs: env_or("CLEANUP_INTERVAL_SECS", defaults.cleanup_interval_secs),
            auth_tokens: env::var("AUTH_TOKENS")
                .map(|raw| parse_auth_tokens(&raw))
                .unwrap_or_default(),
        }
    }

    /// Settings for the data cache.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            max_entries: self.cache_max_entries,
            default_ttl: Duration::from_millis(self.cache_default_ttl_ms),
            dedupe_fetches: self.cache_dedupe_fetches,
        }
    }

    /// Settings for the preview store.
    pub fn preview_settings(&self) -> PreviewSettings {
        PreviewSettings {
            ttl: Duration::from_secs(self.preview_ttl_secs),
            max_entries: self.preview_max_entries,
        }
    }

    /// Interval between background cleanup runs (never zero).
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache_max_entries: 10_000,
            cache_default_ttl_ms: 300_000,
            cache_dedupe_fetches: true,
            preview_ttl_secs: 1800,
            preview_max_entries: 1000,
            cleanup_interval_secs: 60,
            auth_tokens: HashMap::new(),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parses `token=subject,token=subject`; malformed pairs are skipped.
fn parse_auth_tokens(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (token, subject) = pair.split_once('=')?;
            let (token, subject) = (token.trim(), subject.trim());
            if token.is_empty() || subject.is_empty() {
                return None;
            }
            Some((token.to_string(), subject.to_string()))
        })
        .collect()
}
