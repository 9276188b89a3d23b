//! Tile serving layer.
//!
//! This module provides the cached single-tile request path sitting between
//! the HTTP handlers and the imagery provider:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  TileCache   │  │ conditional-GET │  │
//! │  │ (ETag + TTL) │  │    decision     │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            ImageryProvider              │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileService`]: validates, consults the cache, decides 200 vs 304,
//!   fetches on miss, writes through
//! - [`TileCache`]: typed cache entries with content-hash ETags and TTL
//! - [`TileKey`]: composite tile identity `(z, x, y, date, bands, cloud_lt)`
//! - [`CacheStore`] / [`MemoryStore`]: the minimal key-value contract the
//!   cache runs on, and its bundled in-process implementation

mod cache;
mod service;
mod store;

pub use cache::{compute_etag, CachedTile, TileCache, TileKey, DEFAULT_CONTENT_TYPE, DEFAULT_TILE_TTL};
pub use service::{
    validate_date, TileOutcome, TileQuery, TileService, DEFAULT_BANDS, DEFAULT_CLOUD_LT,
};
pub use store::{CacheStore, MemoryStore, DEFAULT_STORE_CAPACITY};
