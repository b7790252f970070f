//! Integration Tests for API Endpoints
//!
//! Tests the full request/response cycle of the admin endpoints against a
//! manager seeded directly through the library.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tenant_cache::{
    api::create_router, models::html::FragmentKey, models::state::SessionData, AppState,
    CacheConfig, CacheManager, Config,
};
use tower::ServiceExt;

// == Helper Functions ==

fn create_state() -> AppState {
    AppState::new(Arc::new(CacheManager::new(CacheConfig::default())))
}

fn app(state: &AppState) -> Router {
    create_router(state.clone())
}

async fn send(state: &AppState, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
    let response = app(state)
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn session(id: &str, fingerprint: &str) -> SessionData {
    let now = Utc::now();
    SessionData {
        session_id: id.to_string(),
        fingerprint_id: fingerprint.to_string(),
        visit_id: format!("visit-{}", id),
        lead_id: None,
        created_at: now,
        last_activity: now,
        expires_at: now + chrono::Duration::hours(24),
    }
}

// == Health and Stats ==

#[tokio::test]
async fn test_health_endpoint() {
    let state = AppState::from_config(&Config::default());

    let (status, json) = send(&state, "GET", "/health", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["tenants"], 0);
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_stats_endpoint_counts_tenants() {
    let state = create_state();
    state.manager.ensure_tenant("acme").unwrap();
    state.manager.ensure_tenant("globex").unwrap();

    let (status, json) = send(&state, "GET", "/stats", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tenant_count"], 2);
    assert_eq!(json["max_tenants"], 100);
    assert!(json.get("combined").is_some());
}

// == Tenant Listing and Invalidation ==

#[tokio::test]
async fn test_list_and_invalidate_all_tenants() {
    let state = create_state();
    state.manager.ensure_tenant("globex").unwrap();
    state.manager.ensure_tenant("acme").unwrap();

    let (status, json) = send(&state, "GET", "/tenants", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    assert_eq!(json["tenants"][0], "acme");

    let (status, json) = send(&state, "DELETE", "/tenants", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 2);
    assert_eq!(state.manager.tenant_count(), 0);
}

#[tokio::test]
async fn test_invalidate_tenant_endpoint() {
    let state = create_state();
    state.manager.ensure_tenant("acme").unwrap();

    let (status, _) = send(&state, "DELETE", "/tenants/acme", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!state.manager.has_tenant("acme"));

    let (status, json) = send(&state, "DELETE", "/tenants/acme", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("acme"));
}

#[tokio::test]
async fn test_tenant_stats_endpoint() {
    let state = create_state();
    let bundle = state.manager.ensure_tenant("acme").unwrap();
    bundle.user_state.set_session(session("s-1", "fp-1"));

    let (status, json) = send(&state, "GET", "/tenants/acme/stats", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tenant_id"], "acme");
    assert_eq!(json["session_count"], 1);
}

#[tokio::test]
async fn test_tenant_stats_unknown_tenant() {
    let state = create_state();

    let (status, json) = send(&state, "GET", "/tenants/ghost/stats", Body::empty()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json.get("error").is_some());
    assert!(!state.manager.has_tenant("ghost"));
}

// == Sessions ==

#[tokio::test]
async fn test_sessions_snapshot_endpoint() {
    let state = create_state();
    let bundle = state.manager.ensure_tenant("acme").unwrap();
    bundle.user_state.set_session(session("s-1", "fp-1"));
    bundle.user_state.set_session(session("s-2", "fp-2"));
    bundle.user_state.set_known_fingerprint("fp-1", true);

    let (status, json) = send(&state, "GET", "/tenants/acme/sessions", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sessionCount"], 2);
    assert_eq!(json["knownFingerprintCount"], 1);
    assert_eq!(json["sessions"].as_array().unwrap().len(), 2);
}

// == HTML Invalidation ==

#[tokio::test]
async fn test_dependency_invalidation_endpoint() {
    let state = create_state();
    let bundle = state.manager.ensure_tenant("acme").unwrap();
    bundle.html.set_html_chunk(
        &FragmentKey::default_for("k1"),
        "<p>1</p>".to_string(),
        vec!["c1".to_string()],
    );
    bundle.html.set_html_chunk(
        &FragmentKey::default_for("k2"),
        "<p>2</p>".to_string(),
        vec!["c1".to_string(), "c2".to_string()],
    );

    let (status, json) = send(
        &state,
        "POST",
        "/tenants/acme/dependencies/c1/invalidate",
        Body::empty(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 2);
    assert_eq!(bundle.html.chunk_count(), 0);
    assert!(bundle.html.dependents_of("c2").is_empty());
}

#[tokio::test]
async fn test_html_pattern_invalidation_endpoint() {
    let state = create_state();
    let bundle = state.manager.ensure_tenant("acme").unwrap();
    for id in ["sf-1", "sf-2", "pane-1"] {
        bundle
            .html
            .set_html_chunk(&FragmentKey::default_for(id), "<div/>".to_string(), vec![]);
    }

    let (status, json) = send(
        &state,
        "DELETE",
        "/tenants/acme/html?pattern=sf-*",
        Body::empty(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 2);

    let (status, json) = send(&state, "DELETE", "/tenants/acme/html", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 1);
    assert_eq!(bundle.html.chunk_count(), 0);
}

#[tokio::test]
async fn test_html_invalidation_unknown_tenant() {
    let state = create_state();

    let (status, _) = send(&state, "DELETE", "/tenants/ghost/html", Body::empty()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == Analytics Purge ==

#[tokio::test]
async fn test_purge_endpoint() {
    let state = create_state();
    let bundle = state.manager.ensure_tenant("acme").unwrap();
    bundle
        .analytics
        .set_hourly_site_bin("2024-02-28-23", Default::default());
    bundle
        .analytics
        .set_hourly_site_bin("2024-03-01-00", Default::default());

    let (status, json) = send(
        &state,
        "POST",
        "/tenants/acme/analytics/purge",
        Body::from(r#"{"cutoff":"2024-03-01-00"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["purged"], 1);
    assert_eq!(json["cutoff"], "2024-03-01-00");
    assert_eq!(bundle.analytics.site_bin_count(), 1);
}

#[tokio::test]
async fn test_purge_rejects_malformed_cutoff() {
    let state = create_state();
    state.manager.ensure_tenant("acme").unwrap();

    let (status, json) = send(
        &state,
        "POST",
        "/tenants/acme/analytics/purge",
        Body::from(r#"{"cutoff":"yesterday"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("yesterday"));
}

#[tokio::test]
async fn test_purge_unknown_tenant_is_not_initialized() {
    let state = create_state();

    let (status, json) = send(
        &state,
        "POST",
        "/tenants/ghost/analytics/purge",
        Body::from(r#"{"cutoff":"2024-03-01-00"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("Tenant not initialized"));
}

#[tokio::test]
async fn test_purge_invalid_json_request() {
    let state = create_state();
    state.manager.ensure_tenant("acme").unwrap();

    let (status, _) = send(
        &state,
        "POST",
        "/tenants/acme/analytics/purge",
        Body::from("not json"),
    )
    .await;

    assert!(status.is_client_error());
}
