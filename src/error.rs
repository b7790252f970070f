//! Error types for the tenant cache
//!
//! Provides unified error handling using thiserror. Cache misses are never
//! errors; every lookup returns `Option` instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the tenant cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A write path expected the tenant to exist already
    #[error("Tenant not initialized: {0}")]
    TenantNotInitialized(String),

    /// A capacity bound could not be restored by eviction (strict policy only)
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::TenantNotInitialized(_) => StatusCode::NOT_FOUND,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::CapacityExceeded(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the tenant cache.
pub type Result<T> = std::result::Result<T, CacheError>;
