//! API route configuration.

use crate::api::handlers::{
    delete_link_handler, shorten_handler, stats_handler, update_link_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Routes mounted under `/api`.
///
/// # Endpoints
///
/// - `POST   /shorten`             - Create a short link
/// - `PATCH  /links/{code}`        - Partially update an owned link
/// - `DELETE /links/{code}`        - Delete an owned link
/// - `GET    /links/{code}/stats`  - Counters and analytics for an owned link
///
/// Callers are identified by [`crate::api::middleware::RequestActor`].
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_handler))
        .route(
            "/links/{code}",
            patch(update_link_handler).delete(delete_link_handler),
        )
        .route("/links/{code}/stats", get(stats_handler))
}
