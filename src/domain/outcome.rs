//! Caller-visible outcomes of the create and resolve paths.

use crate::domain::entities::ShortLink;
use crate::error::AppError;

/// Closed set of results the core hands to the boundary layer.
///
/// Infrastructure failures are not outcomes; they stay `Err(AppError)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created { code: String, link: ShortLink },
    Resolved { target: String },
    NotFound,
    CodeTaken { code: String },
    RateLimited,
    GenerationExhausted { attempts: u32 },
    ValidationFailed { reason: String },
    Forbidden,
}

impl Outcome {
    /// Folds an error into an outcome when it belongs to the outcome set.
    ///
    /// Fatal infrastructure errors are handed back unchanged.
    pub fn from_client_error(err: AppError) -> Result<Self, AppError> {
        match err {
            AppError::Validation { reason } => Ok(Self::ValidationFailed { reason }),
            AppError::NotFound => Ok(Self::NotFound),
            AppError::CodeTaken { code } => Ok(Self::CodeTaken { code }),
            AppError::RateLimited => Ok(Self::RateLimited),
            AppError::Forbidden => Ok(Self::Forbidden),
            AppError::GenerationExhausted { attempts } => Ok(Self::GenerationExhausted { attempts }),
            other => Err(other),
        }
    }
}
