//! API Handlers
//!
//! HTTP request handlers for the admin endpoints. Each handler goes through
//! the shared [`CacheManager`]; none of them hold a lock across an await.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::{CacheManager, ManagerStats, TenantStats};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::state::SessionSnapshot;
use crate::models::{
    HealthResponse, HtmlPatternQuery, InvalidateResponse, PurgeRequest, PurgeResponse,
    TenantListResponse,
};

/// Application state shared across all handlers.
///
/// Holds the one manager built at startup; handlers and background tasks
/// share it through `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<CacheManager>,
}

impl AppState {
    /// Creates a new AppState around an existing manager.
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager }
    }

    /// Creates a new AppState with a fresh manager from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(CacheManager::new(config.cache.clone())))
    }
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.manager.tenant_count()))
}

/// Handler for GET /stats
///
/// Manager-wide totals across every tenant.
pub async fn stats_handler(State(state): State<AppState>) -> Json<ManagerStats> {
    Json(state.manager.stats())
}

/// Handler for GET /tenants
pub async fn list_tenants_handler(State(state): State<AppState>) -> Json<TenantListResponse> {
    Json(TenantListResponse::new(state.manager.tenant_ids()))
}

/// Handler for DELETE /tenants
pub async fn invalidate_all_handler(State(state): State<AppState>) -> Json<InvalidateResponse> {
    let removed = state.manager.invalidate_all();
    Json(InvalidateResponse::new("All tenants invalidated", removed))
}

/// Handler for GET /tenants/:tenant/stats
///
/// Never creates the tenant.
pub async fn tenant_stats_handler(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<Json<TenantStats>> {
    state
        .manager
        .tenant_stats(&tenant)
        .map(Json)
        .ok_or_else(|| CacheError::NotFound(format!("tenant '{}'", tenant)))
}

/// Handler for DELETE /tenants/:tenant
pub async fn invalidate_tenant_handler(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    if !state.manager.invalidate_tenant(&tenant) {
        return Err(CacheError::NotFound(format!("tenant '{}'", tenant)));
    }
    Ok(Json(InvalidateResponse::new(
        format!("Tenant '{}' invalidated", tenant),
        1,
    )))
}

/// Handler for GET /tenants/:tenant/sessions
///
/// Read-only session snapshot for dashboard consumers.
pub async fn sessions_handler(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<Json<SessionSnapshot>> {
    let bundle = state.manager.existing_tenant(&tenant)?;
    Ok(Json(bundle.user_state.session_snapshot()))
}

/// Handler for POST /tenants/:tenant/dependencies/:node/invalidate
///
/// Drops every fragment built from `node`.
pub async fn invalidate_dependency_handler(
    State(state): State<AppState>,
    Path((tenant, node)): Path<(String, String)>,
) -> Result<Json<InvalidateResponse>> {
    let bundle = state.manager.existing_tenant(&tenant)?;
    let removed = bundle.html.invalidate_by_dependency(&node);
    Ok(Json(InvalidateResponse::new(
        format!("Fragments depending on '{}' invalidated", node),
        removed,
    )))
}

/// Handler for DELETE /tenants/:tenant/html?pattern=
///
/// Without a pattern every fragment of the tenant goes.
pub async fn invalidate_html_handler(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Query(query): Query<HtmlPatternQuery>,
) -> Result<Json<InvalidateResponse>> {
    let pattern = query.pattern.unwrap_or_else(|| "*".to_string());
    if pattern.is_empty() {
        return Err(CacheError::InvalidRequest(
            "Pattern cannot be empty".to_string(),
        ));
    }

    let bundle = state.manager.existing_tenant(&tenant)?;
    let removed = bundle.html.invalidate_pattern(&pattern);
    Ok(Json(InvalidateResponse::new(
        format!("Fragments matching '{}' invalidated", pattern),
        removed,
    )))
}

/// Handler for POST /tenants/:tenant/analytics/purge
pub async fn purge_bins_handler(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(req): Json<PurgeRequest>,
) -> Result<Json<PurgeResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let writer = state.manager.analytics_writer(&tenant)?;
    let purged = writer.purge_expired_bins(&req.cutoff);
    Ok(Json(PurgeResponse {
        tenant_id: tenant,
        cutoff: req.cutoff,
        purged,
    }))
}
