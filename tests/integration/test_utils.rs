//! Shared helpers for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use tower::ServiceExt;

use satgate::{
    create_router, AppState, FetchedImage, ImageryProvider, JobQueue, JobQueueConfig, MemoryStore,
    RouterConfig, TileCache, TileFetchRequest, TileService, UpstreamError,
};

/// How the mock provider answers fetches.
pub enum MockMode {
    /// Serve a fixed PNG-ish payload
    Ok,
    /// Fail every fetch with a provider 5xx
    Unavailable,
    /// Fail every fetch with a timeout
    Timeout,
    /// Fail every fetch with a provider 4xx
    Rejected,
}

/// In-memory [`ImageryProvider`] counting upstream calls.
pub struct MockProvider {
    calls: AtomicUsize,
    mode: MockMode,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_mode(MockMode::Ok)
    }

    pub fn with_mode(mode: MockMode) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            mode,
        }
    }

    /// Number of fetches that reached the provider.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageryProvider for MockProvider {
    async fn fetch_tile(&self, _request: &TileFetchRequest) -> Result<FetchedImage, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            MockMode::Ok => Ok(FetchedImage {
                bytes: Bytes::from_static(b"\x89PNG test tile"),
                content_type: "image/png".to_string(),
            }),
            MockMode::Unavailable => Err(UpstreamError::Unavailable { status: 502 }),
            MockMode::Timeout => Err(UpstreamError::Timeout),
            MockMode::Rejected => Err(UpstreamError::Provider {
                status: 400,
                detail: "window too large".to_string(),
            }),
        }
    }
}

/// Build a router over the mock provider with default job settings.
pub fn test_router(provider: Arc<MockProvider>) -> Router {
    test_router_with(provider, JobQueueConfig::default())
}

/// Build a router over the mock provider with custom job settings.
pub fn test_router_with(provider: Arc<MockProvider>, job_config: JobQueueConfig) -> Router {
    let cache = TileCache::new(Arc::new(MemoryStore::new()), Duration::from_secs(3600));
    let tile_service = Arc::new(TileService::new(provider, cache));
    let job_queue = Arc::new(JobQueue::new(Arc::clone(&tile_service), job_config));

    create_router(
        AppState::new(tile_service, job_queue),
        RouterConfig::default().with_tracing(false),
    )
}

/// Issue a GET through the router.
pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router.clone().oneshot(request).await.unwrap()
}

/// Issue a GET with an `If-None-Match` header.
pub async fn get_conditional(router: &Router, uri: &str, etag: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("if-none-match", etag)
        .body(Body::empty())
        .unwrap();
    router.clone().oneshot(request).await.unwrap()
}

/// POST a JSON body, optionally with an `Idempotency-Key`.
pub async fn post_json(
    router: &Router,
    uri: &str,
    body: &serde_json::Value,
    idempotency_key: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = idempotency_key {
        builder = builder.header("idempotency-key", key);
    }
    let request = builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    router.clone().oneshot(request).await.unwrap()
}

/// Collect a response body into bytes.
pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Poll the status endpoint until the job reaches a terminal state.
pub async fn wait_for_terminal_status(router: &Router, job_id: &str) -> serde_json::Value {
    for _ in 0..400 {
        let response = get(router, &format!("/preprocess/{job_id}")).await;
        let job = body_json(response).await;
        let status = job["status"].as_str().unwrap_or_default().to_string();
        if status == "completed" || status == "failed" {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {job_id} never reached a terminal state");
}
