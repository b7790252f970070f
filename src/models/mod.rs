//! Domain records held by the cache, and the request/response DTOs of the
//! admin API.

pub mod analytics;
pub mod content;
pub mod html;
pub mod requests;
pub mod responses;
pub mod state;

// Re-export commonly used types
pub use requests::{HtmlPatternQuery, PurgeRequest};
pub use responses::{
    ErrorResponse, HealthResponse, InvalidateResponse, PurgeResponse, TenantListResponse,
};
