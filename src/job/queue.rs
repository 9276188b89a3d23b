//! Idempotent preprocessing job queue and its worker.
//!
//! `POST /preprocess` lands here: the payload is validated, collapsed onto
//! an idempotency identity, and either matched to an existing job or turned
//! into a new one whose worker is spawned outside the request cycle. The
//! worker walks the covering tile set through the regular single-tile path,
//! warming the cache one provider request at a time.
//!
//! # State machine
//!
//! ```text
//! queued ──► processing ──► completed
//!                      └──► failed
//! ```
//!
//! Terminal states never change. Each job is mutated only by its own worker
//! task; pollers get read-only snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::geo::{self, BBox};
use crate::tile::{validate_date, TileQuery, TileService, DEFAULT_CLOUD_LT};
use crate::upstream::{parse_band_selector, ImageryProvider};

/// Zoom level used when a queue is configured with defaults.
pub const DEFAULT_PREPROCESS_ZOOM: u8 = 12;

/// Tile cap used when a queue is configured with defaults.
pub const DEFAULT_MAX_TILES: usize = 200;

// =============================================================================
// Payload
// =============================================================================

fn default_bands() -> Vec<String> {
    vec!["RGB".to_string()]
}

/// Body of a preprocess request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessPayload {
    /// `[min_lon, min_lat, max_lon, max_lat]` in degrees
    pub bbox: [f64; 4],

    /// Acquisition date, `YYYY-MM-DD`
    pub date: String,

    /// Logical band names (defaults to `["RGB"]`)
    #[serde(default = "default_bands")]
    pub bands: Vec<String>,

    /// Whether cloud masking was requested; carried through the job
    /// identity and record
    #[serde(default)]
    pub cloud_mask: bool,
}

/// A payload that passed validation, with the bands in canonical form.
#[derive(Debug, Clone)]
struct NormalizedPayload {
    bbox: BBox,
    date: String,
    bands: Vec<String>,
    cloud_mask: bool,
}

impl PreprocessPayload {
    /// Validate extents, date, and bands; fail fast before any job exists.
    fn normalize(&self) -> Result<NormalizedPayload, ValidationError> {
        let bbox = BBox::new(self.bbox[0], self.bbox[1], self.bbox[2], self.bbox[3])?;
        validate_date(&self.date)?;
        let selection = parse_band_selector(&self.bands.join(","))?;
        let bands = selection
            .canonical()
            .split(',')
            .map(str::to_string)
            .collect();

        Ok(NormalizedPayload {
            bbox,
            date: self.date.clone(),
            bands,
            cloud_mask: self.cloud_mask,
        })
    }
}

/// Resolve the idempotency identity of a request.
///
/// A caller-supplied key wins outright. Without one, the identity is a
/// stable hash over the normalized payload, so two semantically identical
/// requests collapse to one job no matter how their JSON was spelled.
fn resolve_identity(payload: &NormalizedPayload, key: Option<&str>) -> String {
    if let Some(key) = key {
        return format!("key:{key}");
    }

    let [min_lon, min_lat, max_lon, max_lat] = payload.bbox.to_array();
    let canonical = format!(
        "bbox=[{min_lon},{min_lat},{max_lon},{max_lat}]|date={}|bands={}|cloud_mask={}",
        payload.date,
        payload.bands.join(","),
        payload.cloud_mask,
    );
    format!("sha:{}", hex::encode(Sha256::digest(canonical.as_bytes())))
}

// =============================================================================
// Job record
// =============================================================================

/// Lifecycle state of a preprocessing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether the state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A preprocessing job as stored and as returned by status lookups.
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessJob {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub bbox: [f64; 4],
    pub date: String,
    pub bands: Vec<String>,
    pub cloud_mask: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The enqueue response: job id plus the status observed at return time.
#[derive(Debug, Clone, Serialize)]
pub struct JobTicket {
    pub job_id: Uuid,
    pub status: JobStatus,
}

// =============================================================================
// Queue
// =============================================================================

/// Worker parameters for the queue.
#[derive(Debug, Clone)]
pub struct JobQueueConfig {
    /// Zoom level tiles are warmed at
    pub zoom: u8,

    /// Upper bound on tiles per job; excess tiles are dropped from the
    /// pass, bounding provider cost
    pub max_tiles: usize,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_PREPROCESS_ZOOM,
            max_tiles: DEFAULT_MAX_TILES,
        }
    }
}

/// Job book-keeping guarded by one lock so duplicate detection and job
/// creation happen atomically.
struct JobStore {
    jobs: HashMap<Uuid, PreprocessJob>,
    identities: HashMap<String, Uuid>,
}

/// Accepts preprocess requests, deduplicates them, and runs their workers.
///
/// # Type Parameters
///
/// * `P` - The imagery provider behind the tile service
pub struct JobQueue<P: ImageryProvider + 'static> {
    tiles: Arc<TileService<P>>,
    state: RwLock<JobStore>,
    config: JobQueueConfig,
}

impl<P: ImageryProvider + 'static> JobQueue<P> {
    /// Create a queue driving `tiles` with the given worker parameters.
    pub fn new(tiles: Arc<TileService<P>>, config: JobQueueConfig) -> Self {
        Self {
            tiles,
            state: RwLock::new(JobStore {
                jobs: HashMap::new(),
                identities: HashMap::new(),
            }),
            config,
        }
    }

    /// Accept a preprocess request.
    ///
    /// Validation failures create no job. A request matching an existing
    /// identity returns that job's ticket unchanged, with no side effects.
    /// Otherwise a `queued` job is created, its worker spawned, and the
    /// ticket returned immediately; completion is observed via
    /// [`JobQueue::get_job`].
    pub async fn enqueue(
        self: &Arc<Self>,
        payload: &PreprocessPayload,
        idempotency_key: Option<&str>,
    ) -> Result<JobTicket, ValidationError> {
        let normalized = payload.normalize()?;
        let identity = resolve_identity(&normalized, idempotency_key);

        let mut state = self.state.write().await;
        if let Some(job_id) = state.identities.get(&identity) {
            // jobs and identities are inserted together, so the entry exists
            let job = &state.jobs[job_id];
            debug!(job_id = %job.job_id, status = ?job.status, "duplicate enqueue resolved to existing job");
            return Ok(JobTicket {
                job_id: job.job_id,
                status: job.status,
            });
        }

        let now = Utc::now();
        let job = PreprocessJob {
            job_id: Uuid::new_v4(),
            status: JobStatus::Queued,
            bbox: normalized.bbox.to_array(),
            date: normalized.date.clone(),
            bands: normalized.bands.clone(),
            cloud_mask: normalized.cloud_mask,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        let job_id = job.job_id;
        state.identities.insert(identity, job_id);
        state.jobs.insert(job_id, job);
        drop(state);

        info!(%job_id, "preprocess job accepted");
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            queue.run_worker(job_id, normalized).await;
        });

        Ok(JobTicket {
            job_id,
            status: JobStatus::Queued,
        })
    }

    /// Read-only status lookup; `None` for unknown ids.
    pub async fn get_job(&self, job_id: Uuid) -> Option<PreprocessJob> {
        self.state.read().await.jobs.get(&job_id).cloned()
    }

    /// Number of jobs currently tracked (all states).
    pub async fn job_count(&self) -> usize {
        self.state.read().await.jobs.len()
    }

    async fn transition(
        &self,
        job_id: Uuid,
        status: JobStatus,
        failure_reason: Option<String>,
    ) {
        let mut state = self.state.write().await;
        if let Some(job) = state.jobs.get_mut(&job_id) {
            job.status = status;
            job.failure_reason = failure_reason;
            job.updated_at = Utc::now();
        }
    }

    /// Walk the covering tile set sequentially through the single-tile
    /// path. The first unrecoverable tile failure fails the job; the
    /// enqueue response has long been sent, so failures are only visible
    /// to status pollers.
    async fn run_worker(&self, job_id: Uuid, payload: NormalizedPayload) {
        self.transition(job_id, JobStatus::Processing, None).await;

        let tiles = geo::tiles_for_bbox(&payload.bbox, self.config.zoom);
        let total = tiles.len();
        if total > self.config.max_tiles {
            debug!(
                %job_id,
                total,
                cap = self.config.max_tiles,
                "covering tile set exceeds cap, excess tiles dropped from this pass"
            );
        }

        let bands = payload.bands.join(",");
        for tile in tiles.into_iter().take(self.config.max_tiles) {
            let query = TileQuery {
                z: tile.z,
                x: tile.x,
                y: tile.y,
                date: payload.date.clone(),
                bands: bands.clone(),
                cloud_lt: DEFAULT_CLOUD_LT,
            };

            if let Err(err) = self.tiles.get_tile(&query, None).await {
                warn!(%job_id, z = tile.z, x = tile.x, y = tile.y, %err, "preprocess tile failed");
                self.transition(job_id, JobStatus::Failed, Some(err.to_string()))
                    .await;
                return;
            }
        }

        info!(%job_id, processed = total.min(self.config.max_tiles), "preprocess job completed");
        self.transition(job_id, JobStatus::Completed, None).await;
    }
}

// =============================================================================
// Tests
// =============================================================================
