//! Background removal of expired links.
//!
//! Expired links already resolve as not-found on every read path; this task
//! only reclaims their storage. Realtime click counters and event logs carry
//! no TTL, so they are dropped alongside the rows; otherwise a code reused
//! after reclamation would inherit them. It holds no state between ticks, so
//! it can be stopped and spawned again at any time.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheStore, keys};

/// Codes whose click state is dropped per cache round trip.
const FORGET_BATCH: usize = 256;

pub struct Reclaimer {
    repository: Arc<dyn LinkRepository>,
    cache: Option<Arc<dyn CacheStore>>,
    interval: Duration,
}

impl Reclaimer {
    pub fn new(repository: Arc<dyn LinkRepository>, interval: Duration) -> Self {
        Self {
            repository,
            cache: None,
            interval,
        }
    }

    /// Also drops the click state of every purged code from `cache`.
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Deletes every link whose expiry has passed. Returns how many were removed.
    ///
    /// Cache failures are logged; the rows are already gone at that point.
    pub async fn run_once(&self) -> Result<u64, AppError> {
        let codes = self.repository.purge_expired(Utc::now()).await?;
        let purged = codes.len() as u64;
        if purged == 0 {
            return Ok(0);
        }

        info!(purged, "Reclaimed expired links");
        metrics::counter!("links_reclaimed_total").increment(purged);

        if let Some(cache) = &self.cache {
            for batch in codes.chunks(FORGET_BATCH) {
                let stale: Vec<String> = batch
                    .iter()
                    .flat_map(|code| keys::click_state_keys(code))
                    .collect();
                if let Err(e) = cache.delete(&stale).await {
                    warn!(error = %e, "Failed to drop click state of reclaimed links");
                }
            }
        }

        Ok(purged)
    }

    /// Runs [`Self::run_once`] every interval until `shutdown` flips to `true`
    /// or its sender is dropped. Failed ticks are logged and skipped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?self.interval, "Reclaimer started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(error = %e, "Expired link reclamation failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Reclaimer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockLinkRepository;
    use crate::infrastructure::cache::{CacheError, MemoryCache, MockCacheStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_run_once_reports_count() {
        let mut repo = MockLinkRepository::new();
        repo.expect_purge_expired()
            .times(1)
            .returning(|_| Ok(codes(&["a1b2", "c3d4", "e5f6"])));

        let reclaimer = Reclaimer::new(Arc::new(repo), Duration::from_secs(60));
        assert_eq!(reclaimer.run_once().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_run_once_drops_click_state_of_purged_codes() {
        let cache = Arc::new(MemoryCache::new());
        for code in ["promo", "keep"] {
            cache.incr(&keys::clicks_key(code)).await.unwrap();
            cache
                .push_capped(&keys::analytics_key(code), "{}", 10)
                .await
                .unwrap();
        }

        let mut repo = MockLinkRepository::new();
        repo.expect_purge_expired()
            .returning(|_| Ok(codes(&["promo"])));

        let reclaimer =
            Reclaimer::new(Arc::new(repo), Duration::from_secs(60)).with_cache(cache.clone());
        assert_eq!(reclaimer.run_once().await.unwrap(), 1);

        assert_eq!(cache.get("clicks:promo").await.unwrap(), None);
        assert!(cache.list_range("analytics:promo", 10).await.unwrap().is_empty());
        assert_eq!(cache.get("clicks:keep").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_run_once_skips_cache_when_nothing_expired() {
        let mut repo = MockLinkRepository::new();
        repo.expect_purge_expired().returning(|_| Ok(Vec::new()));

        let mut cache = MockCacheStore::new();
        cache.expect_delete().never();

        let reclaimer = Reclaimer::new(Arc::new(repo), Duration::from_secs(60))
            .with_cache(Arc::new(cache));
        assert_eq!(reclaimer.run_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_once_survives_cache_failure() {
        let mut repo = MockLinkRepository::new();
        repo.expect_purge_expired()
            .returning(|_| Ok(codes(&["promo"])));

        let mut cache = MockCacheStore::new();
        cache
            .expect_delete()
            .times(1)
            .returning(|_| Err(CacheError::ConnectionError("down".into())));

        let reclaimer = Reclaimer::new(Arc::new(repo), Duration::from_secs(60))
            .with_cache(Arc::new(cache));
        assert_eq!(reclaimer.run_once().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_failures_and_stops_on_shutdown() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        let mut repo = MockLinkRepository::new();
        repo.expect_purge_expired().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AppError::Timeout {
                    operation: "purge_expired",
                })
            } else {
                Ok(Vec::new())
            }
        });

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(Reclaimer::new(Arc::new(repo), Duration::from_secs(60)).run(rx));

        tokio::time::sleep(Duration::from_secs(150)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }
}
