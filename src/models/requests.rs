//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

use crate::models::analytics::{parse_hour_key, HOUR_KEY_LEN};

/// Request body for `POST /tenants/:tenant/analytics/purge`
///
/// # Fields
/// - `cutoff`: hour key (`YYYY-MM-DD-HH`); bins before it are purged
#[derive(Debug, Clone, Deserialize)]
pub struct PurgeRequest {
    pub cutoff: String,
}

impl PurgeRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.cutoff.len() != HOUR_KEY_LEN || parse_hour_key(&self.cutoff).is_none() {
            return Some(format!(
                "Cutoff '{}' is not an hour key of the form YYYY-MM-DD-HH",
                self.cutoff
            ));
        }
        None
    }
}

/// Query string for `DELETE /tenants/:tenant/html`
///
/// Without a pattern every fragment of the tenant is dropped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HtmlPatternQuery {
    #[serde(default)]
    pub pattern: Option<String>,
}
