//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache setup, background tasks and the Axum
//! server lifecycle including graceful shutdown.

use crate::application::services::Reclaimer;
use crate::config::Config;
use crate::domain::click_worker::run_click_worker;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::{CacheStore, MemoryCache, RedisCache};
use crate::infrastructure::persistence::PgLinkRepository;
use crate::routes::app_router;
use crate::state::{AppState, HttpSettings};

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use axum::http::HeaderName;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations
/// - Redis cache (or an in-process cache when Redis is absent or unreachable)
/// - Background click worker
/// - Expired link reclaimer
/// - Axum HTTP server
///
/// On shutdown the server stops accepting connections, then the click queue
/// is drained before returning.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let cache = connect_cache(&config).await;
    let repository: Arc<dyn LinkRepository> = Arc::new(PgLinkRepository::new(
        Arc::new(pool),
        config.db_op_timeout(),
    ));

    let (click_tx, click_rx) = mpsc::channel(config.click_queue_capacity);
    let worker = tokio::spawn(run_click_worker(
        click_rx,
        repository.clone(),
        config.click_worker_concurrency,
    ));
    tracing::info!("Click worker started");

    let (reclaim_tx, reclaim_rx) = watch::channel(false);
    let reclaimer = (config.reclaim_interval_seconds > 0).then(|| {
        let reclaimer = Reclaimer::new(
            repository.clone(),
            Duration::from_secs(config.reclaim_interval_seconds),
        )
        .with_cache(cache.clone());
        tokio::spawn(reclaimer.run(reclaim_rx))
    });

    let identity_header = HeaderName::from_bytes(config.identity_header.as_bytes())
        .context("Invalid IDENTITY_HEADER")?;
    let state = AppState::new(
        repository,
        cache,
        click_tx,
        config.policy(),
        HttpSettings {
            base_url: config.base_url.clone(),
            identity_header,
            behind_proxy: config.behind_proxy,
        },
    );

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The router owned the last click sender; the worker now drains and exits.
    tracing::info!("Draining click queue");
    if let Err(e) = worker.await {
        tracing::error!("Click worker panicked: {e}");
    }

    let _ = reclaim_tx.send(true);
    if let Some(handle) = reclaimer {
        let _ = handle.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Connects to Redis when configured, otherwise falls back to [`MemoryCache`].
async fn connect_cache(config: &Config) -> Arc<dyn CacheStore> {
    let Some(redis_url) = &config.redis_url else {
        tracing::info!("Cache: in-process (REDIS_URL not set)");
        return Arc::new(MemoryCache::new());
    };

    match RedisCache::connect(
        redis_url,
        config.redis_connect_timeout(),
        config.cache_op_timeout(),
    )
    .await
    {
        Ok(redis) => {
            tracing::info!("Cache enabled (Redis)");
            Arc::new(redis)
        }
        Err(e) => {
            tracing::warn!("Failed to connect to Redis: {e}. Using in-process cache.");
            Arc::new(MemoryCache::new())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
