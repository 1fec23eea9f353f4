//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::entities::{LinkPatch, NewShortLink, ShortLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::db_error::is_unique_violation_on_code;

const LINK_COLUMNS: &str =
    "code, target, owner, is_custom, click_count, created_at, expires_at, active, metadata";

#[derive(FromRow)]
struct LinkRow {
    code: String,
    target: String,
    owner: Option<String>,
    is_custom: bool,
    click_count: i64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    active: bool,
    metadata: Json<BTreeMap<String, String>>,
}

impl From<LinkRow> for ShortLink {
    fn from(row: LinkRow) -> Self {
        Self {
            code: row.code,
            target: row.target,
            owner: row.owner,
            is_custom: row.is_custom,
            click_count: row.click_count,
            created_at: row.created_at,
            expires_at: row.expires_at,
            active: row.active,
            metadata: row.metadata.0,
        }
    }
}

/// PostgreSQL repository for short links.
///
/// The `short_links_code_key` unique constraint is what keeps codes unique
/// under concurrent inserts. Every statement is bounded by `op_timeout`.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
    op_timeout: Duration,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    async fn bounded<T, F>(&self, operation: &'static str, query: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        tokio::time::timeout(self.op_timeout, query)
            .await
            .map_err(|_| AppError::Timeout { operation })?
            .map_err(AppError::from)
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM short_links WHERE code = $1");
        let row = self
            .bounded(
                "find_by_code",
                sqlx::query_as::<_, LinkRow>(&sql)
                    .bind(code)
                    .fetch_optional(self.pool.as_ref()),
            )
            .await?;

        Ok(row.map(ShortLink::from))
    }

    async fn insert(&self, link: NewShortLink) -> Result<ShortLink, AppError> {
        let sql = format!(
            r#"
            INSERT INTO short_links (code, target, owner, is_custom, expires_at, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {LINK_COLUMNS}
            "#
        );
        let query = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(&link.code)
            .bind(&link.target)
            .bind(&link.owner)
            .bind(link.is_custom)
            .bind(link.expires_at)
            .bind(Json(&link.metadata))
            .fetch_one(self.pool.as_ref());

        match tokio::time::timeout(self.op_timeout, query).await {
            Ok(Ok(row)) => Ok(row.into()),
            Ok(Err(e)) if is_unique_violation_on_code(&e) => Err(AppError::code_taken(link.code)),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(AppError::Timeout { operation: "insert" }),
        }
    }

    async fn increment_clicks(&self, code: &str, count: i64) -> Result<bool, AppError> {
        let result = self
            .bounded(
                "increment_clicks",
                sqlx::query("UPDATE short_links SET click_count = click_count + $2 WHERE code = $1")
                    .bind(code)
                    .bind(count)
                    .execute(self.pool.as_ref()),
            )
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_fields(
        &self,
        code: &str,
        patch: LinkPatch,
    ) -> Result<Option<ShortLink>, AppError> {
        let sql = format!(
            r#"
            UPDATE short_links
            SET target     = COALESCE($2, target),
                active     = COALESCE($3, active),
                expires_at = COALESCE($4, expires_at),
                metadata   = metadata || $5::jsonb
            WHERE code = $1
            RETURNING {LINK_COLUMNS}
            "#
        );
        let row = self
            .bounded(
                "update_fields",
                sqlx::query_as::<_, LinkRow>(&sql)
                    .bind(code)
                    .bind(patch.target)
                    .bind(patch.active)
                    .bind(patch.expires_at)
                    .bind(Json(patch.metadata))
                    .fetch_optional(self.pool.as_ref()),
            )
            .await?;

        Ok(row.map(ShortLink::from))
    }

    async fn delete(&self, code: &str) -> Result<bool, AppError> {
        let result = self
            .bounded(
                "delete",
                sqlx::query("DELETE FROM short_links WHERE code = $1")
                    .bind(code)
                    .execute(self.pool.as_ref()),
            )
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>, AppError> {
        self.bounded(
            "purge_expired",
            sqlx::query_scalar::<_, String>(
                "DELETE FROM short_links WHERE expires_at <= $1 RETURNING code",
            )
            .bind(now)
            .fetch_all(self.pool.as_ref()),
        )
        .await
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.bounded(
            "ping",
            sqlx::query("SELECT 1").execute(self.pool.as_ref()),
        )
        .await?;
        Ok(())
    }
}
