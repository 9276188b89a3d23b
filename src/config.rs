//! Configuration management for the satellite tile gateway.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `SATGATE_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use satgate::config::Config;
//!
//! // Parse from command line and environment
//! let config = Config::parse();
//!
//! println!("Listening on {}", config.bind_address());
//! println!("Upstream: {}", config.upstream_base_url);
//! ```
//!
//! # Environment Variables
//!
//! All configuration options can be set via environment variables with the
//! `SATGATE_` prefix:
//!
//! - `SATGATE_HOST` - Server bind address (default: 0.0.0.0)
//! - `SATGATE_PORT` - Server port (default: 3000)
//! - `SATGATE_UPSTREAM_URL` - Imagery provider base URL
//! - `SATGATE_TOKEN_URL` - OAuth2 token endpoint
//! - `SATGATE_CLIENT_ID` / `SATGATE_CLIENT_SECRET` - OAuth2 credentials
//! - `SATGATE_TILE_TTL` - Tile cache TTL in seconds (default: 21600)
//! - `SATGATE_PREPROCESS_ZOOM` - Zoom level for preprocessing (default: 12)
//! - `SATGATE_MAX_PREPROCESS_TILES` - Tile cap per job (default: 200)
//! - `SATGATE_REQUEST_TIMEOUT` - Upstream per-call timeout seconds (default: 15)
//! - `SATGATE_CACHE_ENTRIES` - Max in-process cache entries (default: 10000)
//! - `SATGATE_CORS_ORIGINS` - Comma-separated allowed origins

use clap::Parser;

use crate::geo::MAX_ZOOM;
use crate::job::{DEFAULT_MAX_TILES, DEFAULT_PREPROCESS_ZOOM};
use crate::tile::DEFAULT_STORE_CAPACITY;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default imagery provider base URL.
pub const DEFAULT_UPSTREAM_URL: &str = "https://services.sentinel-hub.com";

/// Default OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://services.sentinel-hub.com/oauth/token";

/// Default tile cache TTL in seconds (6 hours).
pub const DEFAULT_TILE_TTL_SECONDS: u64 = 21_600;

/// Default per-call upstream request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 15;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Satellite tile gateway.
///
/// Serves cached, conditionally revalidated satellite imagery tiles backed
/// by the Sentinel Hub Process API, plus an asynchronous bulk cache-warming
/// queue.
#[derive(Parser, Debug, Clone)]
#[command(name = "satgate")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "SATGATE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "SATGATE_PORT")]
    pub port: u16,

    // =========================================================================
    // Upstream Configuration
    // =========================================================================
    /// Base URL of the imagery provider's Process API.
    #[arg(long, default_value = DEFAULT_UPSTREAM_URL, env = "SATGATE_UPSTREAM_URL")]
    pub upstream_base_url: String,

    /// OAuth2 token endpoint for the client-credentials exchange.
    #[arg(long, default_value = DEFAULT_TOKEN_URL, env = "SATGATE_TOKEN_URL")]
    pub token_url: String,

    /// OAuth2 client id.
    #[arg(long, env = "SATGATE_CLIENT_ID")]
    pub client_id: String,

    /// OAuth2 client secret.
    #[arg(long, env = "SATGATE_CLIENT_SECRET")]
    pub client_secret: String,

    /// Per-call timeout in seconds for upstream requests (token and
    /// imagery). The only bound on worst-case latency; a timeout is
    /// reported as upstream-unavailable.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECONDS, env = "SATGATE_REQUEST_TIMEOUT")]
    pub request_timeout_secs: u64,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Tile cache TTL in seconds, also advertised via Cache-Control.
    #[arg(long, default_value_t = DEFAULT_TILE_TTL_SECONDS, env = "SATGATE_TILE_TTL")]
    pub tile_ttl_seconds: u64,

    /// Maximum number of entries in the in-process tile store.
    #[arg(long, default_value_t = DEFAULT_STORE_CAPACITY, env = "SATGATE_CACHE_ENTRIES")]
    pub cache_max_entries: usize,

    // =========================================================================
    // Preprocessing Configuration
    // =========================================================================
    /// Zoom level preprocessing jobs warm tiles at.
    #[arg(long, default_value_t = DEFAULT_PREPROCESS_ZOOM, env = "SATGATE_PREPROCESS_ZOOM")]
    pub preprocess_zoom: u8,

    /// Maximum tiles fetched per preprocessing job; excess tiles are
    /// dropped from the pass to bound provider cost.
    #[arg(long, default_value_t = DEFAULT_MAX_TILES, env = "SATGATE_MAX_PREPROCESS_TILES")]
    pub max_preprocess_tiles: usize,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "SATGATE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(
                "Provider credentials are required. Set --client-id/--client-secret \
                 or SATGATE_CLIENT_ID/SATGATE_CLIENT_SECRET"
                    .to_string(),
            );
        }

        if self.upstream_base_url.is_empty() || self.token_url.is_empty() {
            return Err("Upstream base URL and token URL must not be empty".to_string());
        }

        if self.tile_ttl_seconds == 0 {
            return Err("tile_ttl_seconds must be greater than 0".to_string());
        }
        if self.cache_max_entries == 0 {
            return Err("cache_max_entries must be greater than 0".to_string());
        }

        if self.preprocess_zoom > MAX_ZOOM {
            return Err(format!("preprocess_zoom must be between 0 and {MAX_ZOOM}"));
        }
        if self.max_preprocess_tiles == 0 {
            return Err("max_preprocess_tiles must be greater than 0".to_string());
        }

        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Tests
// =============================================================================
