//! API Module
//!
//! Admin HTTP surface over the cache manager.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Manager-wide statistics
//! - `GET /tenants`, `DELETE /tenants` - Tenant listing and wholesale invalidation
//! - `/tenants/:tenant/...` - Per-tenant stats, sessions and invalidation

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
