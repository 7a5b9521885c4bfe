//! Expiry Cleanup Task
//!
//! Background task that periodically drops expired cache entries and previews.
//! Reads already treat expired data as absent; this only bounds memory held by
//! keys nobody asks for again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::preview::PreviewStore;

/// Spawns a background task that purges expired data every `interval`.
///
/// Returns the task handle so shutdown can abort it.
///
/// # Example
/// ```ignore
/// let handle = spawn_cleanup_task(
///     state.cache.clone(),
///     state.previews.clone(),
///     config.cleanup_interval(),
/// );
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task<V>(
    cache: Arc<TtlCache<V>>,
    previews: Arc<PreviewStore>,
    interval: Duration,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting expiry cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let entries = cache.purge_expired().await;
            let swept = previews.sweep_expired().await;

            if entries > 0 || swept > 0 {
                info!(entries, previews = swept, "Expiry cleanup removed stale data");
            } else {
                debug!("Expiry cleanup: nothing expired");
            }
        }
    })
}
