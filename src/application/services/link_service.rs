//! Link creation, resolution and owner management.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::application::services::click_accounting::ClickAccounting;
use crate::application::services::rate_limiter::RateLimiter;
use crate::application::services::resolution_cache::ResolutionCache;
use crate::domain::actor::Actor;
use crate::domain::click_event::ClickEvent;
use crate::domain::entities::{LinkPatch, NewShortLink, ShortLink};
use crate::domain::outcome::Outcome;
use crate::domain::policy::Policy;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::code_generator::{self, validate_custom_code};
use crate::utils::url_normalizer::normalize_url;

/// Produces a candidate code of the requested length.
pub type CodeSource = Arc<dyn Fn(usize) -> Result<String, AppError> + Send + Sync>;

/// Input for [`LinkService::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateLink {
    pub target: String,
    pub custom_code: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: BTreeMap<String, String>,
}

/// Service for creating, resolving and managing short links.
///
/// Handles rate limiting, URL normalization and collision-free code
/// allocation on the way in, and ownership checks for mutations.
pub struct LinkService {
    repository: Arc<dyn LinkRepository>,
    resolver: Arc<ResolutionCache>,
    clicks: Arc<ClickAccounting>,
    limiter: Arc<RateLimiter>,
    code_source: CodeSource,
    policy: Policy,
}

impl LinkService {
    /// Creates a new link service drawing codes from the OS entropy source.
    pub fn new(
        repository: Arc<dyn LinkRepository>,
        resolver: Arc<ResolutionCache>,
        clicks: Arc<ClickAccounting>,
        limiter: Arc<RateLimiter>,
        policy: Policy,
    ) -> Self {
        Self {
            repository,
            resolver,
            clicks,
            limiter,
            code_source: Arc::new(code_generator::generate),
            policy,
        }
    }

    /// Replaces the candidate code generator.
    pub fn with_code_source(mut self, code_source: CodeSource) -> Self {
        self.code_source = code_source;
        self
    }

    /// Creates a short link on behalf of `actor`.
    ///
    /// Client failures come back as [`Outcome`] variants.
    ///
    /// # Errors
    ///
    /// Only infrastructure failures: [`AppError::Database`], [`AppError::Timeout`],
    /// [`AppError::Entropy`].
    pub async fn create(&self, actor: &Actor, request: CreateLink) -> Result<Outcome, AppError> {
        match self.shorten(actor, request).await {
            Ok(link) => Ok(Outcome::Created {
                code: link.code.clone(),
                link,
            }),
            Err(e) => Outcome::from_client_error(e),
        }
    }

    /// Creates a short link, returning every failure as an error.
    ///
    /// # Errors
    ///
    /// - [`AppError::RateLimited`] - the actor exhausted its window
    /// - [`AppError::Validation`] - bad target, custom code or expiry
    /// - [`AppError::CodeTaken`] - the custom code is in use
    /// - [`AppError::GenerationExhausted`] - no free generated code found
    pub async fn shorten(&self, actor: &Actor, request: CreateLink) -> Result<ShortLink, AppError> {
        self.limiter.check(actor).await?;

        let target = normalize_url(&request.target)?;
        let now = Utc::now();
        let expires_at = match request.expires_at {
            Some(at) if at <= now => {
                return Err(AppError::validation("expires_at must be in the future"));
            }
            Some(at) => at,
            None => now + self.policy.retention(),
        };

        let new_link = |code: String, is_custom: bool| NewShortLink {
            code,
            target: target.clone(),
            owner: actor.owner().map(str::to_string),
            is_custom,
            expires_at,
            metadata: request.metadata.clone(),
        };

        let link = match request.custom_code {
            Some(custom) => {
                validate_custom_code(&custom)?;
                if self.repository.find_by_code(&custom).await?.is_some() {
                    return Err(AppError::code_taken(custom));
                }
                self.resolver.write(new_link(custom, true)).await?
            }
            None => self.insert_generated(|code| new_link(code, false)).await?,
        };

        info!(code = %link.code, actor = %actor, custom = link.is_custom, "Short link created");
        metrics::counter!("links_created_total").increment(1);
        Ok(link)
    }

    /// Inserts with generated codes until one sticks.
    ///
    /// The pre-check in [`Self::ensure_unique`] can race with another insert;
    /// the store's unique constraint then reports `CodeTaken` and a fresh code
    /// is drawn.
    async fn insert_generated<F>(&self, build: F) -> Result<ShortLink, AppError>
    where
        F: Fn(String) -> NewShortLink + Send + Sync,
    {
        let attempts = self.policy.max_generation_attempts;
        let length = self.policy.code_length;

        for _ in 0..attempts {
            let source = self.code_source.clone();
            let code = self.ensure_unique(move || source(length), attempts).await?;

            match self.resolver.write(build(code)).await {
                Ok(link) => return Ok(link),
                Err(AppError::CodeTaken { code }) => {
                    debug!(code, "Generated code lost insert race, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        warn!(attempts, "Exhausted insert attempts for generated code");
        metrics::counter!("code_generation_exhausted_total").increment(1);
        Err(AppError::GenerationExhausted { attempts })
    }

    /// Returns the first candidate with no existing record.
    ///
    /// # Errors
    ///
    /// [`AppError::GenerationExhausted`] after `max_attempts` taken candidates,
    /// or the candidate generator's own error.
    pub async fn ensure_unique<F>(&self, mut candidate: F, max_attempts: u32) -> Result<String, AppError>
    where
        F: FnMut() -> Result<String, AppError> + Send,
    {
        for attempt in 1..=max_attempts {
            let code = candidate()?;

            if self.repository.find_by_code(&code).await?.is_none() {
                return Ok(code);
            }

            debug!(code, attempt, "Generated code already taken");
        }

        warn!(max_attempts, "Exhausted code generation attempts");
        metrics::counter!("code_generation_exhausted_total").increment(1);
        Err(AppError::GenerationExhausted {
            attempts: max_attempts,
        })
    }

    /// Resolves `code` for a redirect and records the click.
    ///
    /// # Errors
    ///
    /// Only infrastructure failures on the durable path.
    pub async fn resolve(&self, code: &str, event: ClickEvent) -> Result<Outcome, AppError> {
        match self.resolver.resolve(code, event).await {
            Ok(target) => Ok(Outcome::Resolved { target }),
            Err(e) => Outcome::from_client_error(e),
        }
    }

    /// Loads a link that `actor` owns, in any state.
    ///
    /// # Errors
    ///
    /// [`AppError::NotFound`] if absent, [`AppError::Forbidden`] if the actor
    /// is not its owner. Anonymous links have no owner and cannot be managed.
    pub async fn owned_link(&self, actor: &Actor, code: &str) -> Result<ShortLink, AppError> {
        let link = self
            .repository
            .find_by_code(code)
            .await?
            .ok_or(AppError::NotFound)?;

        if !link.is_owned_by(actor.owner()) {
            return Err(AppError::Forbidden);
        }

        Ok(link)
    }

    /// Applies an owner's changes to a link.
    ///
    /// A new target goes through the same normalization as on create. Metadata
    /// entries are merged into the existing bag.
    ///
    /// # Errors
    ///
    /// [`AppError::NotFound`], [`AppError::Forbidden`], or [`AppError::Validation`]
    /// for a bad target or a past `expires_at`.
    pub async fn update(
        &self,
        actor: &Actor,
        code: &str,
        mut patch: LinkPatch,
    ) -> Result<ShortLink, AppError> {
        let link = self.owned_link(actor, code).await?;

        if let Some(target) = patch.target.take() {
            patch.target = Some(normalize_url(&target)?);
        }
        if let Some(at) = patch.expires_at
            && at <= Utc::now()
        {
            return Err(AppError::validation("expires_at must be in the future"));
        }
        if patch.is_empty() {
            return Ok(link);
        }

        let updated = self
            .resolver
            .update(code, patch)
            .await?
            .ok_or(AppError::NotFound)?;

        info!(code, actor = %actor, "Short link updated");
        Ok(updated)
    }

    /// Deletes an owner's link along with its cached state and click counters.
    ///
    /// # Errors
    ///
    /// [`AppError::NotFound`] or [`AppError::Forbidden`].
    pub async fn delete(&self, actor: &Actor, code: &str) -> Result<(), AppError> {
        let link = self.owned_link(actor, code).await?;

        if !self.resolver.remove(&link).await? {
            return Err(AppError::NotFound);
        }
        self.clicks.forget(code).await;

        info!(code, actor = %actor, "Short link deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::click_worker::ClickTask;
    use crate::domain::repositories::MockLinkRepository;
    use crate::infrastructure::cache::{CacheStore, MemoryCache};
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    fn service_with(repo: MockLinkRepository) -> LinkService {
        let repo: Arc<dyn LinkRepository> = Arc::new(repo);
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        let policy = Policy::default();
        let (tx, _rx) = mpsc::channel::<ClickTask>(16);
        let clicks = Arc::new(ClickAccounting::new(repo.clone(), cache.clone(), tx, 10));
        let resolver = Arc::new(ResolutionCache::new(
            repo.clone(),
            cache.clone(),
            clicks.clone(),
            policy.clone(),
        ));
        let limiter = Arc::new(RateLimiter::new(cache, &policy));
        LinkService::new(repo, resolver, clicks, limiter, policy)
    }

    fn stored(new_link: &NewShortLink) -> ShortLink {
        ShortLink {
            code: new_link.code.clone(),
            target: new_link.target.clone(),
            owner: new_link.owner.clone(),
            is_custom: new_link.is_custom,
            click_count: 0,
            created_at: Utc::now(),
            expires_at: new_link.expires_at,
            active: true,
            metadata: new_link.metadata.clone(),
        }
    }

    fn user() -> Actor {
        Actor::User("u1".to_string())
    }

    fn request(target: &str) -> CreateLink {
        CreateLink {
            target: target.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_and_defaults_expiry() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().returning(|_| Ok(None));
        repo.expect_insert()
            .withf(|link| {
                link.target == "https://example.com/path"
                    && !link.is_custom
                    && link.code.len() == 7
                    && link.owner.as_deref() == Some("u1")
            })
            .times(1)
            .returning(|link| Ok(stored(&link)));

        let service = service_with(repo);
        let outcome = service
            .create(&user(), request("https://EXAMPLE.COM:443/path?utm_source=x"))
            .await
            .unwrap();

        let Outcome::Created { link, .. } = outcome else {
            panic!("expected Created, got {outcome:?}");
        };
        let retention = link.expires_at - Utc::now();
        assert!(retention > Duration::days(29) && retention <= Duration::days(30));
    }

    #[tokio::test]
    async fn test_create_with_custom_code() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code()
            .withf(|code| code == "promo")
            .times(1)
            .returning(|_| Ok(None));
        repo.expect_insert()
            .withf(|link| link.code == "promo" && link.is_custom)
            .times(1)
            .returning(|link| Ok(stored(&link)));

        let service = service_with(repo);
        let outcome = service
            .create(
                &user(),
                CreateLink {
                    custom_code: Some("promo".to_string()),
                    ..request("https://example.com")
                },
            )
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Created { code, .. } if code == "promo"));
    }

    #[tokio::test]
    async fn test_custom_code_taken_is_not_exhaustion() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().returning(|code| {
            Ok(Some(stored(&NewShortLink {
                code: code.to_string(),
                target: "https://other.example/".to_string(),
                owner: None,
                is_custom: true,
                expires_at: Utc::now() + Duration::days(1),
                metadata: BTreeMap::new(),
            })))
        });
        repo.expect_insert().never();

        let service = service_with(repo);
        let outcome = service
            .create(
                &user(),
                CreateLink {
                    custom_code: Some("promo".to_string()),
                    ..request("https://example.com")
                },
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::CodeTaken {
                code: "promo".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_inputs_become_validation_outcomes() {
        let mut repo = MockLinkRepository::new();
        repo.expect_insert().never();
        let service = service_with(repo);

        for request in [
            request("javascript:alert(1)"),
            CreateLink {
                custom_code: Some("no".to_string()),
                ..request("https://example.com")
            },
            CreateLink {
                expires_at: Some(Utc::now() - Duration::hours(1)),
                ..request("https://example.com")
            },
        ] {
            let outcome = service.create(&user(), request).await.unwrap();
            assert!(
                matches!(outcome, Outcome::ValidationFailed { .. }),
                "{outcome:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_ensure_unique_exhausts_after_max_attempts() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(5).returning(|code| {
            Ok(Some(stored(&NewShortLink {
                code: code.to_string(),
                target: "https://example.com/".to_string(),
                owner: None,
                is_custom: false,
                expires_at: Utc::now() + Duration::days(1),
                metadata: BTreeMap::new(),
            })))
        });

        let service = service_with(repo);
        let calls = AtomicUsize::new(0);
        let result = service
            .ensure_unique(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("AAAAAAA".to_string())
                },
                5,
            )
            .await;

        assert!(matches!(
            result,
            Err(AppError::GenerationExhausted { attempts: 5 })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_ensure_unique_skips_taken_candidates() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().returning(|code| {
            if code == "taken01" {
                Ok(Some(stored(&NewShortLink {
                    code: code.to_string(),
                    target: "https://example.com/".to_string(),
                    owner: None,
                    is_custom: false,
                    expires_at: Utc::now() + Duration::days(1),
                    metadata: BTreeMap::new(),
                })))
            } else {
                Ok(None)
            }
        });

        let service = service_with(repo);
        let mut pool = vec!["free002".to_string(), "taken01".to_string()];
        let code = service
            .ensure_unique(|| Ok(pool.pop().unwrap_or_default()), 5)
            .await
            .unwrap();

        assert_eq!(code, "free002");
    }

    #[tokio::test]
    async fn test_insert_conflict_draws_fresh_code() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().returning(|_| Ok(None));

        let inserts = Arc::new(AtomicUsize::new(0));
        let counter = inserts.clone();
        repo.expect_insert().returning(move |link| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AppError::code_taken(link.code))
            } else {
                Ok(stored(&link))
            }
        });

        let service = service_with(repo);
        let outcome = service
            .create(&user(), request("https://example.com"))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Created { .. }));
        assert_eq!(inserts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_generation_exhausted_is_an_outcome() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().returning(|_| Ok(None));
        repo.expect_insert()
            .returning(|link| Err(AppError::code_taken(link.code)));

        let service = service_with(repo);
        let outcome = service
            .create(&user(), request("https://example.com"))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::GenerationExhausted { attempts: 5 });
    }

    #[tokio::test]
    async fn test_entropy_failure_is_fatal() {
        let mut repo = MockLinkRepository::new();
        repo.expect_insert().never();

        let service = service_with(repo)
            .with_code_source(Arc::new(|_: usize| -> Result<String, AppError> {
                Err(AppError::Entropy("unavailable".into()))
            }));
        let result = service.create(&user(), request("https://example.com")).await;

        assert!(matches!(result, Err(AppError::Entropy(_))));
    }

    #[tokio::test]
    async fn test_update_requires_owner() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().returning(|code| {
            Ok(Some(stored(&NewShortLink {
                code: code.to_string(),
                target: "https://example.com/".to_string(),
                owner: Some("someone-else".to_string()),
                is_custom: false,
                expires_at: Utc::now() + Duration::days(1),
                metadata: BTreeMap::new(),
            })))
        });
        repo.expect_update_fields().never();

        let service = service_with(repo);
        let patch = LinkPatch {
            active: Some(false),
            ..Default::default()
        };

        assert!(matches!(
            service.update(&user(), "abc123", patch).await,
            Err(AppError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_anonymous_links_cannot_be_deleted() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().returning(|code| {
            Ok(Some(stored(&NewShortLink {
                code: code.to_string(),
                target: "https://example.com/".to_string(),
                owner: None,
                is_custom: false,
                expires_at: Utc::now() + Duration::days(1),
                metadata: BTreeMap::new(),
            })))
        });
        repo.expect_delete().never();

        let service = service_with(repo);
        let anonymous = Actor::Anonymous("203.0.113.5".parse().unwrap());

        assert!(matches!(
            service.delete(&anonymous, "abc123").await,
            Err(AppError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_missing_link_is_not_found_for_owner_ops() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().returning(|_| Ok(None));

        let service = service_with(repo);
        assert!(matches!(
            service.delete(&user(), "nope").await,
            Err(AppError::NotFound)
        ));
    }
}
