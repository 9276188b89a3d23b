//! Satgate - a caching gateway for tiled satellite imagery.
//!
//! This binary starts the HTTP server and wires up all components.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use satgate::{
    config::Config,
    job::{JobQueue, JobQueueConfig},
    server::{create_router, AppState, RouterConfig},
    tile::{MemoryStore, TileCache, TileService},
    upstream::{SentinelHubClient, TokenCache},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    info!("  Upstream: {}", config.upstream_base_url);
    info!("  Token endpoint: {}", config.token_url);
    info!(
        "  Tile cache: {} entries, {}s TTL",
        config.cache_max_entries, config.tile_ttl_seconds
    );
    info!(
        "  Preprocessing: zoom {}, up to {} tiles/job",
        config.preprocess_zoom, config.max_preprocess_tiles
    );
    info!("  Upstream timeout: {}s", config.request_timeout_secs);

    // One HTTP client carries the per-call timeout for both the token
    // exchange and imagery fetches
    let http = match reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let tokens = TokenCache::new(
        http.clone(),
        config.token_url.clone(),
        config.client_id.clone(),
        config.client_secret.clone(),
    );
    let provider = Arc::new(SentinelHubClient::new(
        http,
        config.upstream_base_url.clone(),
        tokens,
    ));

    // Tile service over the in-process store
    let store = Arc::new(MemoryStore::with_capacity(config.cache_max_entries));
    let cache = TileCache::new(store, Duration::from_secs(config.tile_ttl_seconds));
    let tile_service = Arc::new(TileService::new(provider, cache));

    // Job queue sharing the same tile path
    let job_queue = Arc::new(JobQueue::new(
        Arc::clone(&tile_service),
        JobQueueConfig {
            zoom: config.preprocess_zoom,
            max_tiles: config.max_preprocess_tiles,
        },
    ));

    // Build the router
    let state = AppState::new(tile_service, job_queue);
    let router = create_router(state, build_router_config(&config));

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("Server listening on: http://{}", addr);
    info!("");
    info!("Try these endpoints:");
    info!("  curl http://{}/health", addr);
    info!(
        "  curl 'http://{}/tiles/12/2960/1980?date=2024-05-01&bands=RGB'",
        addr
    );
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "satgate=debug,tower_http=debug"
    } else {
        "satgate=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::default().with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
