//! Shared application state injected into handlers.

use std::sync::Arc;

use axum::http::HeaderName;
use tokio::sync::mpsc;

use crate::application::services::{
    AnalyticsService, ClickAccounting, LinkService, RateLimiter, ResolutionCache,
};
use crate::domain::click_worker::ClickTask;
use crate::domain::policy::Policy;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::CacheStore;

/// Request-facing settings that do not belong to any service.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Prefix for `short_url` in responses.
    pub base_url: String,
    /// Header carrying the authenticated user identity.
    pub identity_header: HeaderName,
    /// Trust `X-Forwarded-For` / `X-Real-IP` for anonymous callers.
    pub behind_proxy: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            identity_header: HeaderName::from_static("x-user-id"),
            behind_proxy: false,
        }
    }
}

/// Application state shared across all request handlers.
///
/// Every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub analytics: Arc<AnalyticsService>,
    pub clicks: Arc<ClickAccounting>,
    pub repository: Arc<dyn LinkRepository>,
    pub cache: Arc<dyn CacheStore>,
    pub http: Arc<HttpSettings>,
}

impl AppState {
    /// Wires the services around one repository and one cache.
    ///
    /// `click_sender` feeds the click worker; the worker stops once every
    /// clone of the returned state is dropped.
    pub fn new(
        repository: Arc<dyn LinkRepository>,
        cache: Arc<dyn CacheStore>,
        click_sender: mpsc::Sender<ClickTask>,
        policy: Policy,
        http: HttpSettings,
    ) -> Self {
        let clicks = Arc::new(ClickAccounting::new(
            repository.clone(),
            cache.clone(),
            click_sender,
            policy.analytics_max_events,
        ));
        let resolver = Arc::new(ResolutionCache::new(
            repository.clone(),
            cache.clone(),
            clicks.clone(),
            policy.clone(),
        ));
        let limiter = Arc::new(RateLimiter::new(cache.clone(), &policy));
        let link_service = Arc::new(LinkService::new(
            repository.clone(),
            resolver,
            clicks.clone(),
            limiter,
            policy,
        ));

        Self::from_parts(link_service, clicks, repository, cache, http)
    }

    /// Assembles state around an already built [`LinkService`].
    pub fn from_parts(
        link_service: Arc<LinkService>,
        clicks: Arc<ClickAccounting>,
        repository: Arc<dyn LinkRepository>,
        cache: Arc<dyn CacheStore>,
        http: HttpSettings,
    ) -> Self {
        let analytics = Arc::new(AnalyticsService::new(link_service.clone(), clicks.clone()));

        Self {
            link_service,
            analytics,
            clicks,
            repository,
            cache,
            http: Arc::new(http),
        }
    }
}
