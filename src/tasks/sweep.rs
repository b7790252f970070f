//! Expiry Sweep Task
//!
//! Background task that periodically drops expired entries from every
//! tenant and purges hourly bins past the retention window.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheManager;

/// Spawns a background task that sweeps all tenants on a fixed interval.
///
/// Each run snapshots the tenant list under a brief manager lock and then
/// sweeps tenant by tenant, so requests to other tenants are never blocked
/// behind it.
///
/// # Arguments
/// * `manager` - The shared cache manager
/// * `sweep_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let manager = Arc::new(CacheManager::new(CacheConfig::default()));
/// let sweep_handle = spawn_sweep_task(manager.clone(), 300);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(manager: Arc<CacheManager>, sweep_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            sweep_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let report = manager.sweep();

            if report.total_removed() > 0 {
                info!(
                    "Expiry sweep: removed {} expired entries and {} bins before {} across {} tenants",
                    report.expired_removed,
                    report.bins_purged,
                    report.cutoff_hour_key.as_deref().unwrap_or("-"),
                    report.tenants_swept
                );
            } else {
                debug!(
                    "Expiry sweep: nothing to remove across {} tenants",
                    report.tenants_swept
                );
            }
        }
    })
}
