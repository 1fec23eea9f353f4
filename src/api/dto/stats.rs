//! DTOs for link statistics.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::services::analytics_service::{AnalyticsSummary, LinkStats};

/// Query for `GET /api/links/{code}/stats`.
#[derive(Debug, Deserialize, Validate)]
pub struct StatsQuery {
    /// Adds a distribution summary over this many days.
    #[validate(range(min = 1, max = 365))]
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: LinkStats,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<AnalyticsSummary>,
}
