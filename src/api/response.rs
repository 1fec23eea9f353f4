//! Rendering of core outcomes as HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::api::dto::link::LinkResponse;
use crate::domain::outcome::Outcome;
use crate::error::AppError;

/// Maps every [`Outcome`] variant to its status code and body.
///
/// | Outcome                | Status |
/// |------------------------|--------|
/// | `Created`              | 201    |
/// | `Resolved`             | 307    |
/// | `ValidationFailed`     | 400    |
/// | `Forbidden`            | 403    |
/// | `NotFound`             | 404    |
/// | `CodeTaken`            | 409    |
/// | `RateLimited`          | 429    |
/// | `GenerationExhausted`  | 503    |
pub fn respond(outcome: Outcome, base_url: &str) -> Response {
    match outcome {
        Outcome::Created { link, .. } => {
            (StatusCode::CREATED, Json(LinkResponse::new(link, base_url))).into_response()
        }
        Outcome::Resolved { target } => Redirect::temporary(&target).into_response(),
        Outcome::NotFound => AppError::NotFound.into_response(),
        Outcome::CodeTaken { code } => AppError::CodeTaken { code }.into_response(),
        Outcome::RateLimited => AppError::RateLimited.into_response(),
        Outcome::GenerationExhausted { attempts } => {
            AppError::GenerationExhausted { attempts }.into_response()
        }
        Outcome::ValidationFailed { reason } => AppError::Validation { reason }.into_response(),
        Outcome::Forbidden => AppError::Forbidden.into_response(),
    }
}
