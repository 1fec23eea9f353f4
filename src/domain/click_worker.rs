//! Background worker applying deferred durable click increments.
//!
//! The cache-hit redirect path never waits on the durable store. It submits a
//! [`ClickTask`] to a bounded channel and moves on; this worker drains the
//! channel and performs the atomic increments. Failures end up in the log
//! and nowhere else.
//!
//! An increment is retried only when the statement provably never reached
//! the store. A timeout or broken connection may land after the UPDATE has
//! committed, so those are logged as a lost click instead.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// Retries after the first attempt of a durable increment that never ran.
const INCREMENT_RETRIES: usize = 3;

/// A pending durable increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickTask {
    pub code: String,
    pub count: i64,
}

impl ClickTask {
    pub fn single(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            count: 1,
        }
    }
}

/// Drains `rx` until every sender is dropped.
///
/// At most `concurrency` increments are in flight at once. On channel close
/// the worker waits for in-flight increments before returning, so awaiting
/// its `JoinHandle` settles all submitted clicks.
pub async fn run_click_worker(
    mut rx: mpsc::Receiver<ClickTask>,
    repository: Arc<dyn LinkRepository>,
    concurrency: usize,
) {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut in_flight = JoinSet::new();

    while let Some(task) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };

        let repository = repository.clone();
        in_flight.spawn(async move {
            let _permit = permit;
            persist_click(repository.as_ref(), task).await;
        });

        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    info!("Click worker stopped");
}

async fn persist_click(repository: &dyn LinkRepository, task: ClickTask) {
    let strategy = ExponentialBackoff::from_millis(10)
        .max_delay(Duration::from_millis(250))
        .map(jitter)
        .take(INCREMENT_RETRIES);

    let attempt = || repository.increment_clicks(&task.code, task.count);
    match RetryIf::spawn(strategy, attempt, never_sent).await {
        Ok(true) => debug!(code = %task.code, count = task.count, "Click persisted"),
        Ok(false) => debug!(code = %task.code, "Click dropped, link no longer exists"),
        Err(e) => {
            metrics::counter!("click_increments_failed_total").increment(1);
            warn!(code = %task.code, error = %e, "Failed to persist click");
        }
    }
}

/// True when the store rejected the increment before executing it.
///
/// sqlx reports `PoolTimedOut` while waiting for a connection, so no
/// statement was sent.
fn never_sent(error: &AppError) -> bool {
    matches!(error, AppError::Database(sqlx::Error::PoolTimedOut))
}
