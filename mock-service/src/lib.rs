use axum::{
    extract::{Query, State},
    http::{header::CACHE_CONTROL, HeaderMap, StatusCode},
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::num::NonZeroU64;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub use axum::http::StatusCode as Status;

/// How the mock responds to every request, regardless of path.
#[derive(Clone, Copy, Debug)]
pub struct Behavior {
    pub status: StatusCode,
    /// Every n-th request answers `500` instead of `status`.
    pub fail_every: Option<NonZeroU64>,
    pub delay: Duration,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            fail_every: None,
            delay: Duration::ZERO,
        }
    }
}

impl Behavior {
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn fail_every(mut self, n: u64) -> Self {
        self.fail_every = NonZeroU64::new(n);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// What the mock has seen so far.
#[derive(Debug, Default)]
pub struct Stats {
    hits: AtomicU64,
    cache_busted: AtomicU64,
    no_cache: AtomicU64,
}

impl Stats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Requests that carried an `rnd` query parameter.
    pub fn cache_busted(&self) -> u64 {
        self.cache_busted.load(Ordering::Relaxed)
    }

    /// Requests that sent `Cache-Control: no-cache`.
    pub fn no_cache(&self) -> u64 {
        self.no_cache.load(Ordering::Relaxed)
    }
}

struct MockState {
    behavior: Behavior,
    stats: Arc<Stats>,
}

pub fn router(behavior: Behavior, stats: Arc<Stats>) -> Router {
    Router::new()
        .fallback(respond)
        .with_state(Arc::new(MockState { behavior, stats }))
}

async fn respond(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    let hit = state.stats.hits.fetch_add(1, Ordering::Relaxed) + 1;
    if query.contains_key("rnd") {
        state.stats.cache_busted.fetch_add(1, Ordering::Relaxed);
    }
    if headers
        .get(CACHE_CONTROL)
        .is_some_and(|v| v.as_bytes() == b"no-cache")
    {
        state.stats.no_cache.fetch_add(1, Ordering::Relaxed);
    }

    if !state.behavior.delay.is_zero() {
        tokio::time::sleep(state.behavior.delay).await;
    }

    match state.behavior.fail_every {
        Some(n) if hit % n.get() == 0 => {
            debug!("MOCK SERVER ___ ERR ({hit})");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => state.behavior.status,
    }
}

/// A mock bound to an ephemeral local port.
pub struct MockServer {
    pub addr: SocketAddr,
    pub stats: Arc<Stats>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(behavior: Behavior) -> anyhow::Result<Self> {
        Self::bind("127.0.0.1:0".parse()?, behavior).await
    }

    pub async fn bind(addr: SocketAddr, behavior: Behavior) -> anyhow::Result<Self> {
        let stats = Arc::new(Stats::default());
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let app = router(behavior, stats.clone());

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!("Mock server stopped: {err}");
            }
        });

        Ok(Self {
            addr,
            stats,
            handle,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Blocks until the server task exits.
    pub async fn wait(mut self) -> anyhow::Result<()> {
        Ok((&mut self.handle).await?)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
