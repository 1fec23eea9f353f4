//! Cache-aside resolution of short codes to targets.
//!
//! The durable store is always written first and the cache only ever holds a
//! projection of state the store already has. Any cache failure degrades to
//! the durable path; it never fails a read or a write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::services::click_accounting::{ClickAccounting, DurableIncrement};
use crate::domain::click_event::ClickEvent;
use crate::domain::entities::{LinkPatch, NewShortLink, ShortLink};
use crate::domain::policy::Policy;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheStore, keys};

/// Value stored under `url:<code>` and `user:<owner>:url:<code>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CachedTarget {
    target: String,
    owner: Option<String>,
    expires_at: DateTime<Utc>,
}

impl CachedTarget {
    fn of(link: &ShortLink) -> Self {
        Self {
            target: link.target.clone(),
            owner: link.owner.clone(),
            expires_at: link.expires_at,
        }
    }
}

pub struct ResolutionCache {
    repository: Arc<dyn LinkRepository>,
    cache: Arc<dyn CacheStore>,
    clicks: Arc<ClickAccounting>,
    policy: Policy,
}

impl ResolutionCache {
    pub fn new(
        repository: Arc<dyn LinkRepository>,
        cache: Arc<dyn CacheStore>,
        clicks: Arc<ClickAccounting>,
        policy: Policy,
    ) -> Self {
        Self {
            repository,
            cache,
            clicks,
            policy,
        }
    }

    /// Cache lifetime for a link: its owner tier, capped at the link's own expiry.
    fn ttl_for(&self, owner: Option<&str>, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
        let until_expiry = (expires_at - now).num_seconds().max(0) as u64;
        self.policy.cache_ttl_for(owner).min(until_expiry)
    }

    async fn cached(&self, code: &str, now: DateTime<Utc>) -> Option<CachedTarget> {
        let raw = match self.cache.get(&keys::url_key(code)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(code, error = %e, "Cache read failed, falling back to store");
                return None;
            }
        };

        match serde_json::from_str::<CachedTarget>(&raw) {
            Ok(entry) if now < entry.expires_at => Some(entry),
            Ok(_) => None,
            Err(e) => {
                warn!(code, error = %e, "Undecodable cache entry, ignoring");
                None
            }
        }
    }

    /// Resolves `code` to its target and records the click.
    ///
    /// On a hit the durable increment is deferred to the click worker; on a
    /// miss it happens inline, after the cache has been repopulated.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the link is absent, inactive or expired,
    /// and the durable store's error if the miss path fails.
    pub async fn resolve(&self, code: &str, event: ClickEvent) -> Result<String, AppError> {
        let now = Utc::now();

        if let Some(entry) = self.cached(code, now).await {
            debug!("Cache HIT for {}", code);
            metrics::counter!("resolution_cache_hits_total").increment(1);

            let ttl = self.ttl_for(entry.owner.as_deref(), entry.expires_at, now);
            for key in keys::target_keys(code, entry.owner.as_deref()) {
                if let Err(e) = self.cache.expire(&key, ttl).await {
                    warn!(key, error = %e, "Failed to refresh cache TTL");
                }
            }

            self.clicks
                .record(code, event, DurableIncrement::Async)
                .await?;
            return Ok(entry.target);
        }

        debug!("Cache MISS for {}", code);
        metrics::counter!("resolution_cache_misses_total").increment(1);

        let link = self
            .repository
            .find_by_code(code)
            .await?
            .filter(|link| link.is_resolvable(now))
            .ok_or(AppError::NotFound)?;

        self.populate(&link).await;
        self.clicks
            .record(code, event, DurableIncrement::Sync)
            .await?;

        Ok(link.target)
    }

    /// Inserts a link durably, then caches it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CodeTaken`] if the code exists, or the store's error.
    pub async fn write(&self, link: NewShortLink) -> Result<ShortLink, AppError> {
        let stored = self.repository.insert(link).await?;
        self.populate(&stored).await;
        Ok(stored)
    }

    /// Applies `patch` durably, then replaces the cached projection.
    ///
    /// Returns `None` if no link has `code`.
    pub async fn update(
        &self,
        code: &str,
        patch: LinkPatch,
    ) -> Result<Option<ShortLink>, AppError> {
        let Some(updated) = self.repository.update_fields(code, patch).await? else {
            return Ok(None);
        };

        self.invalidate(code, updated.owner.as_deref()).await;
        self.populate(&updated).await;
        Ok(Some(updated))
    }

    /// Deletes a link durably, then drops its cached projection.
    pub async fn remove(&self, link: &ShortLink) -> Result<bool, AppError> {
        let removed = self.repository.delete(&link.code).await?;
        self.invalidate(&link.code, link.owner.as_deref()).await;
        Ok(removed)
    }

    /// Drops every cached projection of `code` in one round-trip.
    pub async fn invalidate(&self, code: &str, owner: Option<&str>) {
        match self.cache.delete(&keys::target_keys(code, owner)).await {
            Ok(removed) => debug!(code, removed, "Cache invalidated"),
            Err(e) => warn!(code, error = %e, "Failed to invalidate cache"),
        }
    }

    /// Best-effort cache fill. Links that cannot resolve are never cached.
    pub async fn populate(&self, link: &ShortLink) {
        let now = Utc::now();
        if !link.is_resolvable(now) {
            return;
        }

        let ttl = self
            .policy
            .cache_ttl_for(link.owner.as_deref())
            .min(link.seconds_until_expiry(now));
        if ttl == 0 {
            return;
        }

        let payload = match serde_json::to_string(&CachedTarget::of(link)) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(code = %link.code, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        for key in keys::target_keys(&link.code, link.owner.as_deref()) {
            if let Err(e) = self.cache.set_with_ttl(&key, &payload, ttl).await {
                warn!(key, error = %e, "Failed to populate cache");
            }
        }
    }
}
