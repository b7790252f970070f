//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    health_handler, invalidate_all_handler, invalidate_dependency_handler,
    invalidate_html_handler, invalidate_tenant_handler, list_tenants_handler, purge_bins_handler,
    sessions_handler, stats_handler, tenant_stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Manager-wide statistics
/// - `GET /tenants` / `DELETE /tenants` - List or drop all tenants
/// - `GET /tenants/:tenant/stats` - Per-tenant statistics
/// - `DELETE /tenants/:tenant` - Drop one tenant
/// - `GET /tenants/:tenant/sessions` - Session snapshot
/// - `POST /tenants/:tenant/dependencies/:node/invalidate` - Dependency invalidation
/// - `DELETE /tenants/:tenant/html?pattern=` - Fragment invalidation by pattern
/// - `POST /tenants/:tenant/analytics/purge` - Purge hourly bins before a cutoff
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route(
            "/tenants",
            get(list_tenants_handler).delete(invalidate_all_handler),
        )
        .route("/tenants/:tenant", delete(invalidate_tenant_handler))
        .route("/tenants/:tenant/stats", get(tenant_stats_handler))
        .route("/tenants/:tenant/sessions", get(sessions_handler))
        .route(
            "/tenants/:tenant/dependencies/:node/invalidate",
            post(invalidate_dependency_handler),
        )
        .route("/tenants/:tenant/html", delete(invalidate_html_handler))
        .route("/tenants/:tenant/analytics/purge", post(purge_bins_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
