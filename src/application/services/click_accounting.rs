//! Click counting across the realtime and durable tiers.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::domain::click_event::ClickEvent;
use crate::domain::click_worker::ClickTask;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheStore, keys};

/// How the durable click count is advanced for one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurableIncrement {
    /// Increment inline and propagate failure.
    Sync,
    /// Hand the increment to the click worker and return immediately.
    Async,
}

/// Records clicks in the fast counter, the event log and the durable store.
///
/// The fast counter and event log are best-effort. The durable count is
/// exact for [`DurableIncrement::Sync`]; [`DurableIncrement::Async`] may
/// undercount if the worker queue is saturated, never overcount.
pub struct ClickAccounting {
    repository: Arc<dyn LinkRepository>,
    cache: Arc<dyn CacheStore>,
    click_sender: mpsc::Sender<ClickTask>,
    max_events: usize,
}

impl ClickAccounting {
    pub fn new(
        repository: Arc<dyn LinkRepository>,
        cache: Arc<dyn CacheStore>,
        click_sender: mpsc::Sender<ClickTask>,
        max_events: usize,
    ) -> Self {
        Self {
            repository,
            cache,
            click_sender,
            max_events,
        }
    }

    /// Records one resolution of `code`.
    ///
    /// # Errors
    ///
    /// Only [`DurableIncrement::Sync`] can fail, with the durable store's error.
    pub async fn record(
        &self,
        code: &str,
        event: ClickEvent,
        mode: DurableIncrement,
    ) -> Result<(), AppError> {
        if let Err(e) = self.cache.incr(&keys::clicks_key(code)).await {
            warn!(code, error = %e, "Failed to bump realtime click counter");
        }

        match serde_json::to_string(&event) {
            Ok(payload) => {
                if let Err(e) = self
                    .cache
                    .push_capped(&keys::analytics_key(code), &payload, self.max_events)
                    .await
                {
                    warn!(code, error = %e, "Failed to append click event");
                }
            }
            Err(e) => warn!(code, error = %e, "Failed to encode click event"),
        }

        match mode {
            DurableIncrement::Sync => {
                self.repository.increment_clicks(code, 1).await?;
            }
            DurableIncrement::Async => self.submit(ClickTask::single(code)),
        }

        metrics::counter!("clicks_recorded_total").increment(1);
        Ok(())
    }

    fn submit(&self, task: ClickTask) {
        match self.click_sender.try_send(task) {
            Ok(()) => {}
            Err(TrySendError::Full(task)) => {
                metrics::counter!("clicks_dropped_total").increment(1);
                warn!(code = %task.code, "Click queue full, durable increment dropped");
            }
            Err(TrySendError::Closed(task)) => {
                metrics::counter!("clicks_dropped_total").increment(1);
                warn!(code = %task.code, "Click queue closed, durable increment dropped");
            }
        }
    }

    /// Clicks seen by the realtime counter. Zero when absent or unreadable.
    pub async fn realtime_clicks(&self, code: &str) -> i64 {
        match self.cache.get(&keys::clicks_key(code)).await {
            Ok(Some(raw)) => raw.parse().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                warn!(code, error = %e, "Failed to read realtime click counter");
                0
            }
        }
    }

    /// Newest-first events from the bounded log. Undecodable entries are skipped.
    pub async fn recent_events(&self, code: &str) -> Vec<ClickEvent> {
        match self
            .cache
            .list_range(&keys::analytics_key(code), self.max_events)
            .await
        {
            Ok(entries) => entries
                .iter()
                .filter_map(|raw| serde_json::from_str(raw).ok())
                .collect(),
            Err(e) => {
                warn!(code, error = %e, "Failed to read click events");
                Vec::new()
            }
        }
    }

    /// Drops the realtime counter and event log of a deleted link.
    pub async fn forget(&self, code: &str) {
        match self.cache.delete(&keys::click_state_keys(code)).await {
            Ok(removed) => debug!(code, removed, "Click state forgotten"),
            Err(e) => warn!(code, error = %e, "Failed to forget click state"),
        }
    }

    /// Free slots in the click worker queue.
    pub fn queue_capacity(&self) -> usize {
        self.click_sender.capacity()
    }

    /// Returns true once the click worker has stopped receiving.
    pub fn queue_closed(&self) -> bool {
        self.click_sender.is_closed()
    }
}
