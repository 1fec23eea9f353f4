//! Fixed-window request rate bounding per actor.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::actor::Actor;
use crate::domain::policy::Policy;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheResult, CacheStore, keys};

/// Bounds how many requests an actor can make per window.
///
/// Counters live in the shared cache so every instance sees the same budget.
/// A window opens on the first request and is never extended by later ones.
pub struct RateLimiter {
    cache: Arc<dyn CacheStore>,
    window_seconds: u64,
    max_requests: u64,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn CacheStore>, policy: &Policy) -> Self {
        Self {
            cache,
            window_seconds: policy.rate_window_seconds,
            max_requests: policy.rate_max_requests,
        }
    }

    /// Counts one request for `actor` and reports whether it fits the budget.
    ///
    /// # Errors
    ///
    /// Returns the cache error unchanged; [`Self::check`] decides how to degrade.
    pub async fn allow(
        &self,
        actor: &Actor,
        window_seconds: u64,
        max_requests: u64,
    ) -> CacheResult<bool> {
        let count = self
            .cache
            .incr_window(&keys::rate_key(&actor.key()), window_seconds)
            .await?;

        debug!(actor = %actor, count, max_requests, "Rate window counted");
        Ok(count >= 0 && count as u64 <= max_requests)
    }

    /// Applies the configured window to `actor`.
    ///
    /// Fails open when the cache tier is unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::RateLimited`] once the actor exceeds the budget.
    pub async fn check(&self, actor: &Actor) -> Result<(), AppError> {
        match self
            .allow(actor, self.window_seconds, self.max_requests)
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => {
                metrics::counter!("rate_limited_total").increment(1);
                Err(AppError::RateLimited)
            }
            Err(e) => {
                warn!(actor = %actor, error = %e, "Rate limiter unavailable, allowing request");
                Ok(())
            }
        }
    }
}
