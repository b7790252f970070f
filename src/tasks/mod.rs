//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiry sweep: drops expired entries and old bins from every tenant
//! - Connection cleanup: runs the persistence layer's cleanup hook

mod connection_cleanup;
mod sweep;

pub use connection_cleanup::{noop_cleanup, spawn_connection_cleanup_task, CleanupHook};
pub use sweep::spawn_sweep_task;
