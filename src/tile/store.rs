//! Key-value storage contract for cached tiles.
//!
//! The tile cache only needs two operations from its backing store:
//! `get(key)` and `set_with_ttl(key, bytes, ttl)`. Keeping the contract this
//! narrow lets the cache run against the bundled in-process store or any
//! external key-value service without schema changes.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;

/// Default maximum number of entries held by [`MemoryStore`].
pub const DEFAULT_STORE_CAPACITY: usize = 10_000;

/// Minimal key-value contract consumed by the tile cache.
///
/// Storage is best-effort: a failed or torn read surfaces as `None` and an
/// overwrite always wins. Implementations must be shareable across tasks.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the raw bytes stored under `key`, or `None` when absent,
    /// expired, or unreadable.
    async fn get(&self, key: &str) -> Option<Bytes>;

    /// Store `value` under `key`, replacing any previous entry, and expire
    /// it after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: Bytes, ttl: Duration);
}

// =============================================================================
// In-process store
// =============================================================================

struct StoredEntry {
    value: Bytes,
    expires_at: Instant,
}

/// In-process [`CacheStore`] backed by an LRU map with per-entry expiry.
///
/// Entry count is bounded by capacity; expired entries are dropped lazily
/// on read. Thread-safe behind a `tokio::sync::RwLock`, shareable via `Arc`.
pub struct MemoryStore {
    entries: RwLock<LruCache<String, StoredEntry>>,
}

impl MemoryStore {
    /// Create a store with the default entry capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_STORE_CAPACITY)
    }

    /// Create a store bounded to `max_entries` entries.
    ///
    /// # Panics
    ///
    /// Panics if `max_entries` is zero; config validation rejects that
    /// before construction.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(
                NonZeroUsize::new(max_entries).expect("store capacity must be non-zero"),
            )),
        }
    }

    /// Current number of live entries (expired ones may still be counted
    /// until their next read).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<Bytes> {
        let mut entries = self.entries.write().await;
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    async fn set_with_ttl(&self, key: &str, value: Bytes, ttl: Duration) {
        let entry = StoredEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.put(key.to_string(), entry);
    }
}

// =============================================================================
// Tests
// =============================================================================
