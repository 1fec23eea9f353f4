//! Handlers for owner link management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::link::LinkResponse;
use crate::api::dto::update_link::UpdateLinkRequest;
use crate::api::middleware::RequestActor;
use crate::error::AppError;
use crate::state::AppState;

/// Partially updates a link.
///
/// # Endpoint
///
/// `PATCH /api/links/{code}`
///
/// Only the owner may update. Cached state for the link is invalidated and
/// rebuilt from the stored result.
///
/// # Errors
///
/// - 400 invalid URL, metadata or past expiry
/// - 403 caller is not the owner
/// - 404 code does not exist
pub async fn update_link_handler(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(code): Path<String>,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<Json<LinkResponse>, AppError> {
    payload.validate()?;

    let link = state
        .link_service
        .update(&actor, &code, payload.into())
        .await?;

    Ok(Json(LinkResponse::new(link, &state.http.base_url)))
}

/// Deletes a link with its cached entries and click counters.
///
/// # Endpoint
///
/// `DELETE /api/links/{code}`
///
/// # Response
///
/// **204 No Content**
pub async fn delete_link_handler(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(code): Path<String>,
) -> Result<StatusCode, AppError> {
    state.link_service.delete(&actor, &code).await?;
    Ok(StatusCode::NO_CONTENT)
}
