//! Connection Cleanup Task
//!
//! Runs a plain function hook on its own interval, independent of the
//! cache sweep. The persistence layer registers its pool cleanup here so
//! the cache never depends on it.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Cleanup callback registered by the persistence layer.
pub type CleanupHook = fn();

/// Spawns a background task that calls `hook` every `interval_secs`.
///
/// # Returns
/// A JoinHandle for the spawned task, to abort on shutdown.
pub fn spawn_connection_cleanup_task(hook: CleanupHook, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting connection cleanup task with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;
            hook();
            debug!("Connection cleanup hook ran");
        }
    })
}

/// Hook used when no persistence layer registers one.
pub fn noop_cleanup() {}
