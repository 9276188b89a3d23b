//! Tile Service for orchestrating the single-tile request path.
//!
//! The TileService is the main entry point for tile requests. It
//! orchestrates:
//! - Request validation (tile indices, date, band selector)
//! - Cache lookups and the conditional-GET decision
//! - Upstream fetches through the [`ImageryProvider`] trait
//! - Write-through caching with content-hash ETags
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileService                             │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                    get_tile()                           │    │
//! │  │  1. Validate params    4. On miss, build evalscript     │    │
//! │  │  2. Check cache        5. Fetch from provider           │    │
//! │  │  3. Decide 200/304     6. Write through & return        │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                       │                             │
//! │           ▼                       ▼                             │
//! │    ┌───────────┐         ┌──────────────────┐                   │
//! │    │ TileCache │         │ ImageryProvider  │                   │
//! │    └───────────┘         └──────────────────┘                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use bytes::Bytes;
use chrono::NaiveDate;
use tracing::debug;

use crate::error::{TileError, ValidationError};
use crate::geo;
use crate::upstream::{parse_band_selector, ImageryProvider, TileFetchRequest};

use super::cache::{TileCache, TileKey};

/// Band selector applied when a request omits one.
pub const DEFAULT_BANDS: &str = "RGB";

/// Cloud-coverage threshold applied when a request omits one.
pub const DEFAULT_CLOUD_LT: u8 = 20;

// =============================================================================
// Tile Query
// =============================================================================

/// Parameters identifying one rendered tile.
#[derive(Debug, Clone)]
pub struct TileQuery {
    /// Zoom level (0-22)
    pub z: u8,

    /// Tile column
    pub x: u32,

    /// Tile row
    pub y: u32,

    /// Acquisition date, `YYYY-MM-DD`
    pub date: String,

    /// Band selector (`RGB` or comma-separated band names)
    pub bands: String,

    /// Cloud-coverage threshold carried through the cache key
    pub cloud_lt: u8,
}

/// Validate that `value` is a strict `YYYY-MM-DD` calendar date.
pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    let bytes = value.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if shape_ok && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(ValidationError::InvalidDate {
            value: value.to_string(),
        })
    }
}

// =============================================================================
// Tile Outcome
// =============================================================================

/// Result of a tile request, ready to be shaped into an HTTP response.
#[derive(Debug, Clone)]
pub enum TileOutcome {
    /// The caller's conditional header matched the cached ETag; send 304
    /// with no body.
    NotModified { etag: String },

    /// Tile bytes to send with 200.
    Tile {
        body: Bytes,
        etag: String,
        content_type: String,
        /// Whether the bytes came from cache (`X-Tile-Cache-Hit`)
        cache_hit: bool,
    },
}

impl TileOutcome {
    /// The ETag attached to either outcome.
    pub fn etag(&self) -> &str {
        match self {
            TileOutcome::NotModified { etag } => etag,
            TileOutcome::Tile { etag, .. } => etag,
        }
    }
}

// =============================================================================
// Tile Service
// =============================================================================

/// Service for serving cached, conditionally revalidated tiles.
///
/// # Type Parameters
///
/// * `P` - The imagery provider (production Sentinel Hub client or a mock)
pub struct TileService<P: ImageryProvider> {
    provider: Arc<P>,
    cache: TileCache,
}

impl<P: ImageryProvider> TileService<P> {
    /// Create a service fetching from `provider` and caching through
    /// `cache`.
    pub fn new(provider: Arc<P>, cache: TileCache) -> Self {
        Self { provider, cache }
    }

    /// The cache TTL in seconds, for `Cache-Control: public, max-age=...`.
    pub fn cache_ttl_seconds(&self) -> u64 {
        self.cache.ttl_seconds()
    }

    /// Serve one tile, honoring an `If-None-Match` value when given.
    ///
    /// Validation runs before any cache or network access; a cache hit
    /// never touches the provider. On a miss the fetched bytes are written
    /// through before the response is assembled.
    ///
    /// # Errors
    ///
    /// - [`TileError::Validation`] for bad tile indices, date, or bands
    /// - [`TileError::Upstream`] when the provider or its token endpoint
    ///   fails on a cache miss
    pub async fn get_tile(
        &self,
        query: &TileQuery,
        if_none_match: Option<&str>,
    ) -> Result<TileOutcome, TileError> {
        let bbox = geo::tile_to_bbox(query.z, query.x, query.y)?;
        validate_date(&query.date)?;
        let selection = parse_band_selector(&query.bands)?;

        let key = TileKey {
            z: query.z,
            x: query.x,
            y: query.y,
            date: query.date.clone(),
            bands: selection.canonical(),
            cloud_lt: query.cloud_lt,
        };

        if let Some(cached) = self.cache.get(&key).await {
            if if_none_match == Some(cached.etag.as_str()) {
                debug!(key = %key.storage_key(), "conditional hit, not modified");
                return Ok(TileOutcome::NotModified { etag: cached.etag });
            }
            debug!(key = %key.storage_key(), "cache hit");
            return Ok(TileOutcome::Tile {
                body: cached.body,
                etag: cached.etag,
                content_type: cached.content_type,
                cache_hit: true,
            });
        }

        let fetch = TileFetchRequest {
            bbox,
            date: query.date.clone(),
            evalscript: selection.evalscript(),
        };
        let image = self.provider.fetch_tile(&fetch).await?;
        let etag = self.cache.put(&key, &image.bytes, &image.content_type).await;
        debug!(key = %key.storage_key(), bytes = image.bytes.len(), "cache miss, wrote through");

        Ok(TileOutcome::Tile {
            body: image.bytes,
            etag,
            content_type: image.content_type,
            cache_hit: false,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
