//! Preview Store Module
//!
//! Maps generated preview ids to theme/layout settings for a fixed TTL.
//! Every store or retrieve call first sweeps all expired previews.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::clock::{duration_ms, Clock, SystemClock};
use crate::error::{AppError, Result};
use crate::preview::{generate_preview_id, PREVIEW_TTL_SECS};

/// Message returned for unknown and expired ids alike.
const NOT_FOUND_MESSAGE: &str = "Preview not found or expired";

// == Settings ==
#[derive(Debug, Clone)]
pub struct PreviewSettings {
    /// Lifetime of a preview from creation, not refreshable
    pub ttl: Duration,
    /// Maximum number of live previews; the one expiring first is dropped
    /// to make room
    pub max_entries: usize,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(PREVIEW_TTL_SECS),
            max_entries: 1000,
        }
    }
}

// == Preview Entry ==
/// A stored preview payload.
#[derive(Debug, Clone)]
pub struct PreviewEntry {
    /// The submitted settings, shared read-only with readers
    pub settings: Arc<Value>,
    /// Absolute expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl PreviewEntry {
    /// Expired from the exact millisecond the TTL has elapsed, so an
    /// expired id always misses.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }
}

// == Preview Store ==
#[derive(Debug)]
pub struct PreviewStore {
    entries: RwLock<HashMap<String, PreviewEntry>>,
    settings: PreviewSettings,
    clock: Arc<dyn Clock>,
}

impl PreviewStore {
    // == Constructor ==
    pub fn new(settings: PreviewSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            settings,
            clock,
        }
    }

    pub fn with_system_clock(settings: PreviewSettings) -> Self {
        Self::new(settings, Arc::new(SystemClock))
    }

    // == Store ==
    /// Validates `settings`, stores it and returns the new preview id.
    ///
    /// `settings` must be a JSON object with a non-empty string `username`.
    pub async fn store(&self, settings: Value) -> Result<String> {
        let username = validate_settings(&settings)?.to_string();

        let now = self.clock.now_ms();
        let mut entries = self.entries.write().await;
        sweep(&mut entries, now);

        if entries.len() >= self.settings.max_entries.max(1) {
            evict_first_expiring(&mut entries);
        }

        let mut id = generate_preview_id(&username, now);
        while entries.contains_key(&id) {
            id = generate_preview_id(&username, now);
        }

        entries.insert(
            id.clone(),
            PreviewEntry {
                settings: Arc::new(settings),
                expires_at: now.saturating_add(duration_ms(self.settings.ttl)),
            },
        );
        debug!(preview_id = %id, "Stored preview settings");
        Ok(id)
    }

    // == Retrieve ==
    /// Returns the settings stored under `id`.
    ///
    /// Fails with [`AppError::NotFound`] if the id is unknown or expired.
    pub async fn retrieve(&self, id: &str) -> Result<Arc<Value>> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.write().await;
        sweep(&mut entries, now);

        entries
            .get(id)
            .map(|entry| Arc::clone(&entry.settings))
            .ok_or_else(|| AppError::NotFound(NOT_FOUND_MESSAGE.to_string()))
    }

    // == Sweep Expired ==
    /// Removes every expired preview. Returns the number removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut entries = self.entries.write().await;
        sweep(&mut entries, now)
    }

    /// Number of stored previews, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn validate_settings(settings: &Value) -> Result<&str> {
    let object = settings.as_object().ok_or_else(|| {
        AppError::Validation("Preview settings must be a JSON object".to_string())
    })?;

    match object.get("username").and_then(Value::as_str) {
        Some(username) if !username.trim().is_empty() => Ok(username),
        _ => {
            warn!("Rejected preview settings without username");
            Err(AppError::Validation(
                "Preview settings require a non-empty username".to_string(),
            ))
        }
    }
}

fn sweep(entries: &mut HashMap<String, PreviewEntry>, now_ms: u64) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired_at(now_ms));
    let removed = before - entries.len();
    if removed > 0 {
        debug!(removed, "Swept expired previews");
    }
    removed
}

fn evict_first_expiring(entries: &mut HashMap<String, PreviewEntry>) {
    let oldest = entries
        .iter()
        .min_by(|(ka, a), (kb, b)| a.expires_at.cmp(&b.expires_at).then_with(|| ka.cmp(kb)))
        .map(|(key, _)| key.clone());

    if let Some(key) = oldest {
        entries.remove(&key);
        debug!(preview_id = %key, "Evicted preview to stay within bound");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    const T0: u64 = 1_700_000_000_000;

    fn store_with(settings: PreviewSettings) -> (PreviewStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        (PreviewStore::new(settings, clock.clone()), clock)
    }

    fn store() -> (PreviewStore, Arc<ManualClock>) {
        store_with(PreviewSettings::default())
    }

    #[tokio::test]
    async fn test_round_trip() {
        let (store, _) = store();
        let settings = json!({"username": "bob", "theme": "dark"});

        let id = store.store(settings.clone()).await.unwrap();
        let retrieved = store.retrieve(&id).await.unwrap();

        assert_eq!(*retrieved, settings);
        assert!(id.starts_with(&format!("bob_{T0}_")));
    }

    #[tokio::test]
    async fn test_retrieve_shares_payload() {
        let (store, _) = store();
        let id = store.store(json!({"username": "bob"})).await.unwrap();

        let a = store.retrieve(&id).await.unwrap();
        let b = store.retrieve(&id).await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_expires_after_thirty_minutes() {
        let (store, clock) = store();
        let id = store.store(json!({"username": "bob"})).await.unwrap();

        clock.advance(Duration::from_secs(30 * 60 - 1));
        assert!(store.retrieve(&id).await.is_ok());

        clock.advance(Duration::from_secs(1));
        let result = store.retrieve(&id).await;
        assert_eq!(
            result.unwrap_err(),
            AppError::NotFound(NOT_FOUND_MESSAGE.to_string())
        );
    }

    #[tokio::test]
    async fn test_unknown_id_not_found() {
        let (store, _) = store();
        assert!(matches!(
            store.retrieve("nobody_0_x").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_validation_rejects_missing_username() {
        let (store, _) = store();

        for invalid in [
            json!({}),
            json!(null),
            json!("bob"),
            json!([{"username": "bob"}]),
            json!({"username": ""}),
            json!({"username": "   "}),
            json!({"username": 42}),
        ] {
            assert!(
                matches!(store.store(invalid.clone()).await, Err(AppError::Validation(_))),
                "accepted {invalid}"
            );
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_any_access_sweeps_all_expired() {
        let (store, clock) = store();
        store.store(json!({"username": "a"})).await.unwrap();
        store.store(json!({"username": "b"})).await.unwrap();
        assert_eq!(store.len().await, 2);

        clock.advance(Duration::from_secs(PREVIEW_TTL_SECS));
        let _ = store.retrieve("unrelated").await;

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_sweeps_before_insert() {
        let (store, clock) = store();
        store.store(json!({"username": "old"})).await.unwrap();

        clock.advance(Duration::from_secs(PREVIEW_TTL_SECS + 1));
        store.store(json!({"username": "new"})).await.unwrap();

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_expired_counts() {
        let (store, clock) = store();
        store.store(json!({"username": "a"})).await.unwrap();
        clock.advance(Duration::from_secs(60));
        store.store(json!({"username": "b"})).await.unwrap();

        clock.advance(Duration::from_secs(PREVIEW_TTL_SECS - 30));
        assert_eq!(store.sweep_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_bound_evicts_first_expiring() {
        let (store, clock) = store_with(PreviewSettings {
            max_entries: 2,
            ..PreviewSettings::default()
        });

        let first = store.store(json!({"username": "a"})).await.unwrap();
        clock.advance(Duration::from_secs(1));
        let second = store.store(json!({"username": "b"})).await.unwrap();
        clock.advance(Duration::from_secs(1));
        let third = store.store(json!({"username": "c"})).await.unwrap();

        assert_eq!(store.len().await, 2);
        assert!(store.retrieve(&first).await.is_err());
        assert!(store.retrieve(&second).await.is_ok());
        assert!(store.retrieve(&third).await.is_ok());
    }
}
