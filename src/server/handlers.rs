//! HTTP request handlers for the satellite tile API.
//!
//! This module contains the Axum handlers for tiles, preprocessing jobs,
//! and health checks.
//!
//! # Endpoints
//!
//! - `GET /tiles/{z}/{x}/{y}` - Serve a rendered tile (conditional-GET aware)
//! - `POST /preprocess` - Enqueue a bulk cache-warming job
//! - `GET /preprocess/{job_id}` - Poll job status
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{TileError, UpstreamError, ValidationError};
use crate::job::{JobQueue, JobTicket, PreprocessPayload};
use crate::tile::{TileOutcome, TileQuery, TileService, DEFAULT_BANDS, DEFAULT_CLOUD_LT};
use crate::upstream::ImageryProvider;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state handed to every handler.
pub struct AppState<P: ImageryProvider + 'static> {
    /// The single-tile request path
    pub tile_service: Arc<TileService<P>>,

    /// The preprocessing job queue
    pub job_queue: Arc<JobQueue<P>>,
}

impl<P: ImageryProvider + 'static> AppState<P> {
    /// Create the state from already shared services.
    pub fn new(
        tile_service: Arc<TileService<P>>,
        job_queue: Arc<JobQueue<P>>,
    ) -> Self {
        Self {
            tile_service,
            job_queue,
        }
    }
}

impl<P: ImageryProvider + 'static> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            tile_service: Arc::clone(&self.tile_service),
            job_queue: Arc::clone(&self.job_queue),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile requests: `/tiles/{z}/{x}/{y}`.
///
/// Signed or non-numeric segments are rejected by the extractor before the
/// handler runs; range checks against the zoom level happen in the service.
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    /// Zoom level
    pub z: u8,

    /// Tile column
    pub x: u32,

    /// Tile row
    pub y: u32,
}

/// Query parameters for tile requests.
#[derive(Debug, Deserialize)]
pub struct TileQueryParams {
    /// Acquisition date, `YYYY-MM-DD` (required)
    #[serde(default)]
    pub date: Option<String>,

    /// Band selector (defaults to `RGB`)
    #[serde(default = "default_bands")]
    pub bands: String,

    /// Cloud-coverage threshold (defaults to 20)
    #[serde(default = "default_cloud_lt")]
    pub cloud_lt: u8,
}

fn default_bands() -> String {
    DEFAULT_BANDS.to_string()
}

fn default_cloud_lt() -> u8 {
    DEFAULT_CLOUD_LT
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g. "invalid_date", "upstream_unavailable")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

fn validation_error_type(err: &ValidationError) -> &'static str {
    match err {
        ValidationError::InvalidTile { .. } => "invalid_tile",
        ValidationError::InvalidBBox { .. } => "invalid_bbox",
        ValidationError::InvalidDate { .. } => "invalid_date",
        ValidationError::UnknownBand { .. } => "unknown_band",
        ValidationError::EmptyBands => "empty_bands",
    }
}

fn upstream_error_parts(err: &UpstreamError) -> (StatusCode, &'static str) {
    match err {
        // Provider 4xx is the caller's problem, passed through with detail
        UpstreamError::Provider { .. } => (StatusCode::BAD_REQUEST, "provider_rejected"),
        UpstreamError::TokenExchange { .. } => (StatusCode::BAD_GATEWAY, "upstream_auth"),
        UpstreamError::Unavailable { .. } => (StatusCode::BAD_GATEWAY, "upstream_unavailable"),
        UpstreamError::Transport(_) => (StatusCode::BAD_GATEWAY, "upstream_unavailable"),
        UpstreamError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, "upstream_timeout"),
    }
}

fn log_and_respond(status: StatusCode, error_type: &str, message: String) -> Response {
    // Log errors based on severity
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Resource not found: {}",
            message
        );
    } else if status.is_client_error() {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let error_response = ErrorResponse::with_status(error_type, message, status);
    (status, Json(error_response)).into_response()
}

/// Convert ValidationError to HTTP 400 with a typed error code.
impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        log_and_respond(
            StatusCode::BAD_REQUEST,
            validation_error_type(&self),
            self.to_string(),
        )
    }
}

/// Convert UpstreamError to 400/502/503 per the taxonomy.
impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        let (status, error_type) = upstream_error_parts(&self);
        log_and_respond(status, error_type, self.to_string())
    }
}

/// Convert TileError to HTTP response.
///
/// Validation failures are 400s; upstream failures map onto 502/503 except
/// provider 4xx, which stays a client error carrying the provider detail.
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        match self {
            TileError::Validation(err) => err.into_response(),
            TileError::Upstream(err) => err.into_response(),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /tiles/{z}/{x}/{y}?date=YYYY-MM-DD&bands=RGB&cloud_lt=20`
///
/// # Headers
///
/// - `If-None-Match`: ETag from a previous response; a match short-circuits
///   to `304 Not Modified` with no body
///
/// # Response
///
/// - `200 OK`: image bytes with `ETag`, `Content-Type`,
///   `Cache-Control: public, max-age=<ttl>`, `X-Tile-Cache-Hit`
/// - `304 Not Modified`: conditional header matched, no body
/// - `400 Bad Request`: invalid z/x/y, date, or band selector; also
///   provider-side rejections, with the provider's detail attached
/// - `502/503`: upstream unavailable or timed out
pub async fn tile_handler<P: ImageryProvider + 'static>(
    State(state): State<AppState<P>>,
    Path(params): Path<TilePathParams>,
    Query(query): Query<TileQueryParams>,
    headers: HeaderMap,
) -> Result<Response, TileError> {
    let date = query.date.unwrap_or_default();
    let tile_query = TileQuery {
        z: params.z,
        x: params.x,
        y: params.y,
        date,
        bands: query.bands,
        cloud_lt: query.cloud_lt,
    };

    let if_none_match = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok());

    let outcome = state.tile_service.get_tile(&tile_query, if_none_match).await?;

    let cache_control = format!(
        "public, max-age={}",
        state.tile_service.cache_ttl_seconds()
    );

    let response = match outcome {
        TileOutcome::NotModified { etag } => Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header(header::ETAG, etag)
            .header(header::CACHE_CONTROL, cache_control)
            .body(axum::body::Body::empty())
            .unwrap(),
        TileOutcome::Tile {
            body,
            etag,
            content_type,
            cache_hit,
        } => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::ETAG, etag)
            .header(header::CACHE_CONTROL, cache_control)
            .header("X-Tile-Cache-Hit", cache_hit.to_string())
            .body(axum::body::Body::from(body))
            .unwrap(),
    };

    Ok(response)
}

/// Handle preprocess submissions.
///
/// # Endpoint
///
/// `POST /preprocess` with JSON body
/// `{"bbox": [minLon, minLat, maxLon, maxLat], "date": "YYYY-MM-DD",
///   "bands": ["RGB"], "cloud_mask": false}`
///
/// # Headers
///
/// - `Idempotency-Key`: optional caller-chosen identity; repeats with the
///   same key return the same job
///
/// # Response
///
/// - `202 Accepted` with `{job_id, status}`; the job runs outside the
///   request cycle and is observed via the status endpoint
/// - `400 Bad Request`: invalid bbox, date, or bands; no job created
pub async fn preprocess_handler<P: ImageryProvider + 'static>(
    State(state): State<AppState<P>>,
    headers: HeaderMap,
    Json(payload): Json<PreprocessPayload>,
) -> Result<(StatusCode, Json<JobTicket>), ValidationError> {
    let idempotency_key = headers
        .get("idempotency-key")
        .and_then(|value| value.to_str().ok());

    let ticket = state.job_queue.enqueue(&payload, idempotency_key).await?;
    Ok((StatusCode::ACCEPTED, Json(ticket)))
}

/// Handle job status lookups.
///
/// # Endpoint
///
/// `GET /preprocess/{job_id}`
///
/// # Response
///
/// - `200 OK` with the full job record (status, extents, timestamps, and
///   `failure_reason` when failed)
/// - `404 Not Found` for unknown (or malformed) job ids
pub async fn job_status_handler<P: ImageryProvider + 'static>(
    State(state): State<AppState<P>>,
    Path(job_id): Path<String>,
) -> Response {
    let job = match Uuid::parse_str(&job_id) {
        Ok(id) => state.job_queue.get_job(id).await,
        Err(_) => None,
    };

    match job {
        Some(job) => (StatusCode::OK, Json(job)).into_response(),
        None => log_and_respond(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("Unknown preprocess job: {job_id}"),
        ),
    }
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
