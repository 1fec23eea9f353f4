//! DTO for the link update endpoint.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use validator::Validate;

use super::metadata::validate_metadata;
use crate::domain::entities::LinkPatch;

/// Request body for `PATCH /api/links/{code}`.
///
/// All fields are optional; only provided fields are changed. `metadata`
/// entries are merged into the stored bag.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateLinkRequest {
    /// New destination URL for this link.
    #[validate(url(message = "Invalid URL format"), length(max = 2048))]
    pub url: Option<String>,

    /// Enable or disable resolution without deleting the link.
    pub active: Option<bool>,

    /// New expiry; must be in the future.
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default)]
    #[validate(custom(function = "validate_metadata"))]
    pub metadata: BTreeMap<String, String>,
}

impl From<UpdateLinkRequest> for LinkPatch {
    fn from(req: UpdateLinkRequest) -> Self {
        Self {
            target: req.url,
            active: req.active,
            expires_at: req.expires_at,
            metadata: req.metadata,
        }
    }
}
