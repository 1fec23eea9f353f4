//! DTOs for link shortening endpoint.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use validator::Validate;

use super::metadata::validate_metadata;
use crate::application::services::CreateLink;

/// Request body for `POST /api/shorten`.
///
/// ```json
/// {
///   "url": "https://example.com/page",
///   "custom_code": "promo",
///   "expires_at": "2026-01-01T00:00:00Z",
///   "metadata": { "campaign": "spring" }
/// }
/// ```
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The original URL to shorten (must be valid HTTP/HTTPS).
    #[validate(url(message = "Invalid URL format"), length(max = 2048))]
    pub url: String,

    /// Optional custom short code. Character rules are enforced by the service.
    #[validate(length(min = 4, max = 20))]
    pub custom_code: Option<String>,

    /// Optional expiry; defaults to the configured retention.
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default)]
    #[validate(custom(function = "validate_metadata"))]
    pub metadata: BTreeMap<String, String>,
}

impl From<ShortenRequest> for CreateLink {
    fn from(req: ShortenRequest) -> Self {
        Self {
            target: req.url,
            custom_code: req.custom_code,
            expires_at: req.expires_at,
            metadata: req.metadata,
        }
    }
}
