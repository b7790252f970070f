//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies. Stats endpoints
//! serialize the cache's own stats types directly.

use serde::Serialize;

/// Response body for tenant listing (GET /tenants)
#[derive(Debug, Clone, Serialize)]
pub struct TenantListResponse {
    pub tenants: Vec<String>,
    pub count: usize,
}

impl TenantListResponse {
    pub fn new(tenants: Vec<String>) -> Self {
        Self {
            count: tenants.len(),
            tenants,
        }
    }
}

/// Response body for every invalidation endpoint
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Success message
    pub message: String,
    /// Number of tenants or fragments removed
    pub removed: usize,
}

impl InvalidateResponse {
    /// Creates a new InvalidateResponse
    pub fn new(message: impl Into<String>, removed: usize) -> Self {
        Self {
            message: message.into(),
            removed,
        }
    }
}

/// Response body for the bin purge (POST /tenants/:tenant/analytics/purge)
#[derive(Debug, Clone, Serialize)]
pub struct PurgeResponse {
    pub tenant_id: String,
    pub cutoff: String,
    pub purged: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Number of tenants currently cached
    pub tenants: usize,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(tenants: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            tenants,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_list_counts_tenants() {
        let resp = TenantListResponse::new(vec!["acme".to_string(), "globex".to_string()]);
        assert_eq!(resp.count, 2);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["tenants"][1], "globex");
    }

    #[test]
    fn test_invalidate_response_serialize() {
        let resp = InvalidateResponse::new("Tenant 'acme' invalidated", 1);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("acme"));
        assert!(json.contains("\"removed\":1"));
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy(3);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
        assert!(json.contains("\"tenants\":3"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
