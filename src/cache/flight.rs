//! In-flight Fetch Registry
//!
//! One async mutex per key currently being fetched. The first caller for a
//! missing key holds the slot while it fetches; later callers queue on the
//! same slot and re-check the cache once it is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OwnedMutexGuard;
use tracing::warn;

type Slot = Arc<tokio::sync::Mutex<()>>;

#[derive(Debug, Default)]
pub(crate) struct FlightRegistry {
    slots: Mutex<HashMap<String, Slot>>,
}

impl FlightRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits until no other caller holds the slot for `key`, then holds it
    /// until the returned guard is dropped.
    pub(crate) async fn join(&self, key: &str) -> FlightGuard<'_> {
        let slot = {
            let mut slots = self.lock("join");
            // Slots abandoned by callers cancelled while queueing.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(key.to_string()).or_default().clone()
        };

        let mut guard = FlightGuard {
            registry: self,
            key: key.to_string(),
            slot: slot.clone(),
            permit: None,
        };
        guard.permit = Some(slot.lock_owned().await);
        guard
    }

    /// Number of keys with a fetch in progress or queued.
    pub(crate) fn len(&self) -> usize {
        self.lock("len").len()
    }

    fn release(&self, key: &str, slot: &Slot) {
        let mut slots = self.lock("release");
        let idle = slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && Arc::strong_count(slot) <= 2);
        if idle {
            slots.remove(key);
        }
    }

    fn lock(&self, op: &'static str) -> MutexGuard<'_, HashMap<String, Slot>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    op,
                    lock_kind = "mutex.lock",
                    result = "poisoned_recovered",
                    "Recovered from poisoned in-flight registry lock"
                );
                poisoned.into_inner()
            }
        }
    }
}

/// Holds a key's fetch slot. Dropping it, including by cancellation,
/// hands the slot to the next waiter or removes it when nobody waits.
pub(crate) struct FlightGuard<'a> {
    registry: &'a FlightRegistry,
    key: String,
    slot: Slot,
    permit: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.permit.take();
        self.registry.release(&self.key, &self.slot);
    }
}
