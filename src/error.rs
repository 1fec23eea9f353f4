//! Application error taxonomy and its HTTP rendering.
//!
//! Errors fall into three classes:
//!
//! - **Client** - [`AppError::Validation`], [`AppError::NotFound`], [`AppError::CodeTaken`],
//!   [`AppError::RateLimited`], [`AppError::Forbidden`]. Returned verbatim, never retried.
//! - **Fatal infrastructure** - [`AppError::Database`], [`AppError::Timeout`],
//!   [`AppError::Entropy`], [`AppError::GenerationExhausted`], [`AppError::Internal`].
//!   Surfaced as server errors; retry policy belongs to the caller.
//! - **Transient infrastructure** - cache failures. These never become an `AppError`;
//!   see [`crate::infrastructure::cache::CacheError`].

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

/// Seconds a client should wait before retrying a 503 response.
const RETRY_AFTER_SECONDS: &str = "1";

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Machine-readable error payload returned by the HTTP layer.
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    #[error("Short link not found")]
    NotFound,

    #[error("Code '{code}' is already taken")]
    CodeTaken { code: String },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Operation not permitted for this actor")]
    Forbidden,

    #[error("Failed to generate a unique code after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    #[error("Entropy source unavailable: {0}")]
    Entropy(String),

    #[error("Durable store timed out during {operation}")]
    Timeout { operation: &'static str },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn code_taken(code: impl Into<String>) -> Self {
        Self::CodeTaken { code: code.into() }
    }

    /// Returns true for errors caused by the caller rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::NotFound
                | Self::CodeTaken { .. }
                | Self::RateLimited
                | Self::Forbidden
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::CodeTaken { .. } => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::GenerationExhausted { .. } | Self::Timeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Entropy(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Builds the error payload without leaking infrastructure details.
    pub fn to_error_info(&self) -> ErrorInfo {
        let (code, message, details) = match self {
            Self::Validation { reason } => (
                "validation_error",
                "Validation failed".to_string(),
                json!({ "reason": reason }),
            ),
            Self::NotFound => ("not_found", self.to_string(), json!({})),
            Self::CodeTaken { code } => ("code_taken", self.to_string(), json!({ "code": code })),
            Self::RateLimited => ("rate_limited", self.to_string(), json!({})),
            Self::Forbidden => ("forbidden", self.to_string(), json!({})),
            Self::GenerationExhausted { attempts } => (
                "generation_exhausted",
                "Could not allocate a short code, try again".to_string(),
                json!({ "attempts": attempts }),
            ),
            Self::Timeout { operation } => (
                "timeout",
                "Storage did not respond in time".to_string(),
                json!({ "operation": operation }),
            ),
            Self::Entropy(_) | Self::Database(_) | Self::Internal(_) => (
                "internal_error",
                "Internal server error".to_string(),
                json!({}),
            ),
        };

        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorBody {
            error: self.to_error_info(),
        };

        if status == StatusCode::SERVICE_UNAVAILABLE {
            return (
                status,
                [(header::RETRY_AFTER, RETRY_AFTER_SECONDS)],
                Json(body),
            )
                .into_response();
        }

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::validation(errors.to_string())
    }
}
