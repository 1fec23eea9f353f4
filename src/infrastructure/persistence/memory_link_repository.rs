//! In-process link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::entities::{LinkPatch, NewShortLink, ShortLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// Link repository kept in a process-local map.
///
/// Insert is check-and-set under one lock, giving it the same uniqueness
/// guarantee as the Postgres constraint. Used by tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryLinkRepository {
    links: Mutex<HashMap<String, ShortLink>>,
}

impl MemoryLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.links.lock().map(|links| links.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, ShortLink>>, AppError> {
        self.links
            .lock()
            .map_err(|_| AppError::Internal("link store lock poisoned".into()))
    }
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError> {
        Ok(self.lock()?.get(code).cloned())
    }

    async fn insert(&self, link: NewShortLink) -> Result<ShortLink, AppError> {
        let mut links = self.lock()?;
        if links.contains_key(&link.code) {
            return Err(AppError::code_taken(link.code));
        }

        let stored = ShortLink {
            code: link.code.clone(),
            target: link.target,
            owner: link.owner,
            is_custom: link.is_custom,
            click_count: 0,
            created_at: Utc::now(),
            expires_at: link.expires_at,
            active: true,
            metadata: link.metadata,
        };
        links.insert(link.code, stored.clone());
        Ok(stored)
    }

    async fn increment_clicks(&self, code: &str, count: i64) -> Result<bool, AppError> {
        Ok(match self.lock()?.get_mut(code) {
            Some(link) => {
                link.click_count += count;
                true
            }
            None => false,
        })
    }

    async fn update_fields(
        &self,
        code: &str,
        patch: LinkPatch,
    ) -> Result<Option<ShortLink>, AppError> {
        let mut links = self.lock()?;
        let Some(link) = links.get_mut(code) else {
            return Ok(None);
        };

        if let Some(target) = patch.target {
            link.target = target;
        }
        if let Some(active) = patch.active {
            link.active = active;
        }
        if let Some(expires_at) = patch.expires_at {
            link.expires_at = expires_at;
        }
        link.metadata.extend(patch.metadata);

        Ok(Some(link.clone()))
    }

    async fn delete(&self, code: &str) -> Result<bool, AppError> {
        Ok(self.lock()?.remove(code).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>, AppError> {
        let mut links = self.lock()?;
        let mut purged = Vec::new();
        links.retain(|code, link| {
            let expired = link.is_expired(now);
            if expired {
                purged.push(code.clone());
            }
            !expired
        });
        Ok(purged)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }
}
