//! Handler for per-link statistics.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use validator::Validate;

use crate::api::dto::stats::{StatsQuery, StatsResponse};
use crate::api::middleware::RequestActor;
use crate::error::AppError;
use crate::state::AppState;

/// Returns click counters and realtime analytics for an owned link.
///
/// # Endpoint
///
/// `GET /api/links/{code}/stats?days=7`
///
/// `days` (1-365) adds a device/browser/referrer distribution over that
/// window. Distributions are computed from the bounded recent-event log;
/// `durable_clicks` is exact.
///
/// # Errors
///
/// - 403 caller is not the owner
/// - 404 code does not exist
pub async fn stats_handler(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(code): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    query.validate()?;

    let stats = state.analytics.link_stats(&actor, &code).await?;
    let summary = match query.days {
        Some(days) => Some(state.analytics.summary(&actor, &code, days).await?),
        None => None,
    };

    Ok(Json(StatsResponse { stats, summary }))
}
