//! Repository trait for the durable short link store.

use crate::domain::entities::{LinkPatch, NewShortLink, ShortLink};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable, authoritative store of short links.
///
/// Generated and custom codes share one namespace. Implementations must
/// enforce uniqueness of `code` themselves (a unique index, or an atomic
/// check-and-insert); application-level pre-checks are only an optimization.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryLinkRepository`] - in-process store
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Finds a link by code regardless of its state.
    ///
    /// Serves both lookups by generated code and by custom code, since they
    /// share the column. Callers apply [`ShortLink::is_resolvable`] themselves.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Timeout`] or [`AppError::Database`] on storage failure.
    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError>;

    /// Inserts a new link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CodeTaken`] if the code already exists.
    async fn insert(&self, new_link: NewShortLink) -> Result<ShortLink, AppError>;

    /// Atomically adds `n` to the click counter.
    ///
    /// Returns `Ok(false)` if no link has this code.
    async fn increment_clicks(&self, code: &str, n: i64) -> Result<bool, AppError>;

    /// Applies a partial update and returns the new record, `None` if absent.
    async fn update_fields(
        &self,
        code: &str,
        patch: LinkPatch,
    ) -> Result<Option<ShortLink>, AppError>;

    /// Deletes a link. Returns `Ok(false)` if it did not exist.
    async fn delete(&self, code: &str) -> Result<bool, AppError>;

    /// Removes every link whose `expires_at` is at or before `now`.
    ///
    /// Returns the codes of the removed records.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>, AppError>;

    /// Round-trips to the store for health reporting.
    async fn ping(&self) -> Result<(), AppError>;
}
