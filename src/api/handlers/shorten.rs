//! Handler for link creation.

use axum::{Json, extract::State, response::Response};
use validator::Validate;

use crate::api::dto::shorten::ShortenRequest;
use crate::api::middleware::RequestActor;
use crate::api::response::respond;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com/page", "custom_code": "promo" }
/// ```
///
/// # Response
///
/// **201 Created**
///
/// ```json
/// {
///   "code": "promo",
///   "short_url": "https://s.example.com/promo",
///   "target": "https://example.com/page",
///   "is_custom": true,
///   "active": true,
///   "created_at": "2025-03-10T12:00:00Z",
///   "expires_at": "2025-04-09T12:00:00Z",
///   "metadata": {}
/// }
/// ```
///
/// # Errors
///
/// - 400 invalid body, URL, custom code or expiry
/// - 409 custom code already taken
/// - 429 actor rate limit exhausted
/// - 503 no free generated code after the configured attempts
pub async fn shorten_handler(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(payload): Json<ShortenRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;

    let outcome = state.link_service.create(&actor, payload.into()).await?;
    Ok(respond(outcome, &state.http.base_url))
}
