#![allow(dead_code)]

use axum::Router;
use axum::extract::ConnectInfo;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower::Layer;

use shortlink_resolver::domain::click_worker::{ClickTask, run_click_worker};
use shortlink_resolver::domain::entities::{NewShortLink, ShortLink};
use shortlink_resolver::domain::policy::Policy;
use shortlink_resolver::domain::repositories::LinkRepository;
use shortlink_resolver::infrastructure::cache::MemoryCache;
use shortlink_resolver::infrastructure::persistence::MemoryLinkRepository;
use shortlink_resolver::routes::router;
use shortlink_resolver::state::{AppState, HttpSettings};

pub const BASE_URL: &str = "https://s.example.com";
pub const PEER: &str = "127.0.0.1:12345";

/// Injects a fixed peer address, as `into_make_service_with_connect_info` would.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = PEER.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}

/// Application wired to the in-memory adapters with a live click worker.
pub struct TestApp {
    pub state: AppState,
    pub repository: Arc<MemoryLinkRepository>,
    pub cache: Arc<MemoryCache>,
    pub worker: JoinHandle<()>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(Policy::default())
    }

    pub fn with_policy(policy: Policy) -> Self {
        let repository = Arc::new(MemoryLinkRepository::new());
        let cache = Arc::new(MemoryCache::new());
        let (tx, rx) = mpsc::channel::<ClickTask>(1_000);
        let worker = tokio::spawn(run_click_worker(rx, repository.clone(), 8));

        let state = AppState::new(
            repository.clone(),
            cache.clone(),
            tx,
            policy,
            HttpSettings {
                base_url: BASE_URL.to_string(),
                ..Default::default()
            },
        );

        Self {
            state,
            repository,
            cache,
            worker,
        }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone()).layer(MockConnectInfoLayer)
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router()).unwrap()
    }

    /// Stores a link directly, bypassing validation and the cache.
    pub async fn seed(&self, code: &str, target: &str, owner: Option<&str>, expires_at: DateTime<Utc>) -> ShortLink {
        self.repository
            .insert(NewShortLink {
                code: code.to_string(),
                target: target.to_string(),
                owner: owner.map(str::to_string),
                is_custom: true,
                expires_at,
                metadata: BTreeMap::new(),
            })
            .await
            .unwrap()
    }

    pub async fn durable_clicks(&self, code: &str) -> i64 {
        self.repository
            .find_by_code(code)
            .await
            .unwrap()
            .map(|link| link.click_count)
            .unwrap_or(0)
    }

    /// Polls the durable count until it reaches `expected` or a deadline passes.
    pub async fn wait_for_clicks(&self, code: &str, expected: i64) -> i64 {
        let mut count = self.durable_clicks(code).await;
        for _ in 0..200 {
            if count >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            count = self.durable_clicks(code).await;
        }
        count
    }
}
