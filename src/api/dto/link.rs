//! Link representation returned by the API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;

use crate::domain::entities::ShortLink;

/// JSON view of a link, returned on create and update.
#[skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub code: String,
    pub short_url: String,
    pub target: String,
    pub owner: Option<String>,
    pub is_custom: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub metadata: BTreeMap<String, String>,
}

impl LinkResponse {
    pub fn new(link: ShortLink, base_url: &str) -> Self {
        Self {
            short_url: format!("{}/{}", base_url.trim_end_matches('/'), link.code),
            code: link.code,
            target: link.target,
            owner: link.owner,
            is_custom: link.is_custom,
            active: link.active,
            created_at: link.created_at,
            expires_at: link.expires_at,
            metadata: link.metadata,
        }
    }
}
