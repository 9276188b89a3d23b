//! Asynchronous bulk-preprocessing jobs.
//!
//! Accepts bounding-box warm-up requests, deduplicates them by idempotency
//! key or payload hash, and drives a per-job worker through the single-tile
//! path so that later interactive tile requests hit the cache.

mod queue;

pub use queue::{
    JobQueue, JobQueueConfig, JobStatus, JobTicket, PreprocessJob, PreprocessPayload,
    DEFAULT_MAX_TILES, DEFAULT_PREPROCESS_ZOOM,
};
