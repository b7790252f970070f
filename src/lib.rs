//! Tenant Cache - multi-tenant in-memory cache for a content-serving backend
//!
//! Holds, per tenant, content entities, visitor and session state, rendered
//! HTML fragments and hourly analytics, with TTL staleness, bounded tenant
//! count and least-recently-accessed eviction.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheManager;
pub use config::{CacheConfig, CapacityPolicy, Config};
pub use error::CacheError;
pub use tasks::{spawn_connection_cleanup_task, spawn_sweep_task};
