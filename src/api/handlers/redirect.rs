//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, header},
    response::Response,
};

use crate::api::response::respond;
use crate::domain::click_event::ClickEvent;
use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its target URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Look up `url:<code>` in the cache; an entry past its expiry is a miss
/// 2. On a miss, read the durable store and populate the cache
/// 3. Count the click: realtime counter and event log always, durable
///    increment inline on a miss or queued on a hit
/// 4. Return 307 Temporary Redirect
///
/// Unknown, inactive and expired codes all answer 404.
///
/// # Errors
///
/// Only durable store failures surface as errors (500/503).
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_agent = headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok());
    let referer = headers.get(header::REFERER).and_then(|v| v.to_str().ok());
    let event = ClickEvent::new(user_agent, referer);

    let outcome = state.link_service.resolve(&code, event).await?;
    Ok(respond(outcome, &state.http.base_url))
}
