mod common;

use axum_test::TestServer;
use common::TestApp;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

use shortlink_resolver::domain::policy::Policy;
use shortlink_resolver::infrastructure::cache::MemoryCache;
use shortlink_resolver::infrastructure::persistence::MemoryLinkRepository;
use shortlink_resolver::routes::router;
use shortlink_resolver::state::{AppState, HttpSettings};

#[tokio::test]
async fn test_health_ok() {
    let app = TestApp::new();
    let server = app.server();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["checks"]["database"]["status"], "ok");
    assert_eq!(body["checks"]["cache"]["status"], "ok");
    assert_eq!(body["checks"]["click_queue"]["status"], "ok");
}

#[tokio::test]
async fn test_health_reports_closed_click_queue() {
    let (tx, rx) = mpsc::channel(8);
    drop(rx);

    let state = AppState::new(
        Arc::new(MemoryLinkRepository::new()),
        Arc::new(MemoryCache::new()),
        tx,
        Policy::default(),
        HttpSettings::default(),
    );
    let server = TestServer::new(router(state)).unwrap();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), 503);
    let body: Value = response.json();
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["checks"]["click_queue"]["status"], "error");
}
