//! # Satgate
//!
//! A caching gateway for tiled satellite imagery.
//!
//! This library serves slippy-map tiles rendered on demand by the Sentinel
//! Hub Process API, a per-request-billed provider authenticated through an
//! OAuth2 client-credentials flow. Tiles are cached with content-hash ETags
//! and a TTL so interactive map clients revalidate cheaply, and a bulk
//! "preprocess" queue warms the cache over whole bounding boxes ahead of
//! time.
//!
//! ## Features
//!
//! - **Conditional tile serving**: content-hash ETags with `304 Not
//!   Modified` revalidation and `Cache-Control` headers
//! - **Cost control**: every rendered tile is cached with a TTL; bulk jobs
//!   are capped to a configurable number of tiles
//! - **Token lifecycle**: the OAuth2 access token is fetched once and
//!   reused until shortly before expiry
//! - **Idempotent preprocessing**: duplicate submissions collapse onto one
//!   job by `Idempotency-Key` or payload hash
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`geo`] - Web-Mercator tile math (index ⇄ bounding box)
//! - [`upstream`] - Evalscript builder, OAuth token cache, Process API client
//! - [`tile`] - Tile cache, key-value store contract, and the tile service
//! - [`job`] - Idempotent preprocessing queue and worker
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use satgate::{
//!     create_router, AppState, JobQueue, JobQueueConfig, MemoryStore, RouterConfig,
//!     SentinelHubClient, TileCache, TileService, TokenCache,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let http = reqwest::Client::new();
//!     let tokens = TokenCache::new(
//!         http.clone(),
//!         "https://services.sentinel-hub.com/oauth/token",
//!         "client-id",
//!         "client-secret",
//!     );
//!     let provider = Arc::new(SentinelHubClient::new(
//!         http,
//!         "https://services.sentinel-hub.com",
//!         tokens,
//!     ));
//!
//!     let cache = TileCache::new(Arc::new(MemoryStore::new()), Duration::from_secs(21_600));
//!     let tile_service = Arc::new(TileService::new(provider, cache));
//!     let job_queue = Arc::new(JobQueue::new(
//!         Arc::clone(&tile_service),
//!         JobQueueConfig::default(),
//!     ));
//!
//!     let router = create_router(
//!         AppState::new(tile_service, job_queue),
//!         RouterConfig::default(),
//!     );
//!
//!     // Start the server...
//!     let _ = router;
//! }
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod job;
pub mod server;
pub mod tile;
pub mod upstream;

// Re-export commonly used types
pub use config::Config;
pub use error::{TileError, UpstreamError, ValidationError};
pub use geo::{tile_to_bbox, tiles_for_bbox, BBox, TileIndex, MAX_ZOOM, WEB_MERCATOR_MAX_LAT};
pub use job::{
    JobQueue, JobQueueConfig, JobStatus, JobTicket, PreprocessJob, PreprocessPayload,
};
pub use server::{
    create_router, health_handler, job_status_handler, preprocess_handler, tile_handler, AppState,
    ErrorResponse, HealthResponse, RouterConfig, TilePathParams, TileQueryParams,
};
pub use tile::{
    compute_etag, validate_date, CacheStore, CachedTile, MemoryStore, TileCache, TileKey,
    TileOutcome, TileQuery, TileService,
};
pub use upstream::{
    build_evalscript, parse_band_selector, BandSelection, FetchedImage, ImageryProvider,
    SentinelHubClient, TileFetchRequest, TokenCache,
};
