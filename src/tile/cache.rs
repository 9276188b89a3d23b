//! Content-addressed tile cache with ETag support.
//!
//! Rendered tiles are stored through the [`CacheStore`] contract as JSON
//! entries carrying base64 bytes, a content-hash ETag, the content type,
//! and the write timestamp. The ETag is the SHA-256 of the raw image bytes,
//! computed once on write; an update is always a whole-entry replace.
//!
//! # Cache Key
//!
//! `tile:{z}:{x}:{y}:{date}:{bands}:{cloud_lt}` — the band selector is
//! normalized before keying so `rgb` and `RGB` share an entry.
//!
//! # Corrupt Entries
//!
//! An entry that fails JSON or base64 decoding is treated as a cache miss
//! and re-fetched, never surfaced as an error.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::store::CacheStore;

/// Default time-to-live for cached tiles: 6 hours.
pub const DEFAULT_TILE_TTL: Duration = Duration::from_secs(21_600);

/// Content type assumed when the provider omits one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/png";

// =============================================================================
// Cache Key
// =============================================================================

/// Composite identity of a rendered tile.
///
/// Two requests agreeing on every field address the same cache entry and
/// correlate on the same ETag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Zoom level (0-22)
    pub z: u8,

    /// Tile column at that zoom
    pub x: u32,

    /// Tile row at that zoom
    pub y: u32,

    /// Acquisition date, `YYYY-MM-DD`
    pub date: String,

    /// Normalized band selector (e.g. `RGB` or `RED,NIR`)
    pub bands: String,

    /// Cloud-coverage threshold carried in the request
    pub cloud_lt: u8,
}

impl TileKey {
    /// Render the storage key string.
    pub fn storage_key(&self) -> String {
        format!(
            "tile:{}:{}:{}:{}:{}:{}",
            self.z, self.x, self.y, self.date, self.bands, self.cloud_lt
        )
    }
}

/// Compute the content-hash ETag for a tile body.
///
/// Deterministic: identical bytes always hash to the same tag.
pub fn compute_etag(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

// =============================================================================
// Cached Entry
// =============================================================================

/// Wire form of a cache entry as persisted through the store.
#[derive(Debug, Serialize, Deserialize)]
struct CachedTileRecord {
    /// Base64-encoded image bytes
    data: String,
    etag: String,
    content_type: String,
    cached_at: DateTime<Utc>,
}

/// A tile read back from the cache, bytes already decoded.
#[derive(Debug, Clone)]
pub struct CachedTile {
    pub body: Bytes,
    pub etag: String,
    pub content_type: String,
    pub cached_at: DateTime<Utc>,
}

// =============================================================================
// Tile Cache
// =============================================================================

/// TTL-bounded cache of rendered tile bytes.
///
/// Wraps a [`CacheStore`] with the typed entry format and ETag computation.
/// Shareable across tasks via `Arc`.
pub struct TileCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl TileCache {
    /// Create a cache over `store` with the given entry TTL.
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// The entry TTL in whole seconds, as advertised in `Cache-Control`.
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl.as_secs()
    }

    /// Look up a tile. Expired, absent, and corrupt entries all read as
    /// `None`.
    pub async fn get(&self, key: &TileKey) -> Option<CachedTile> {
        let raw = self.store.get(&key.storage_key()).await?;

        let record: CachedTileRecord = match serde_json::from_slice(&raw) {
            Ok(record) => record,
            Err(err) => {
                debug!(key = %key.storage_key(), %err, "discarding undecodable cache entry");
                return None;
            }
        };
        let body = match BASE64.decode(&record.data) {
            Ok(body) => Bytes::from(body),
            Err(err) => {
                debug!(key = %key.storage_key(), %err, "discarding corrupt tile payload");
                return None;
            }
        };

        Some(CachedTile {
            body,
            etag: record.etag,
            content_type: record.content_type,
            cached_at: record.cached_at,
        })
    }

    /// Store a freshly rendered tile and return its ETag.
    pub async fn put(&self, key: &TileKey, body: &Bytes, content_type: &str) -> String {
        let etag = compute_etag(body);
        let record = CachedTileRecord {
            data: BASE64.encode(body),
            etag: etag.clone(),
            content_type: content_type.to_string(),
            cached_at: Utc::now(),
        };
        // CachedTileRecord has no unserializable fields
        let raw = serde_json::to_vec(&record).expect("cache record serializes");
        self.store
            .set_with_ttl(&key.storage_key(), Bytes::from(raw), self.ttl)
            .await;
        etag
    }
}

// =============================================================================
// Tests
// =============================================================================
