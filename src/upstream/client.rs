//! Authenticated client for the imagery provider's Process API.
//!
//! Builds the typed request body (bounds, acquisition day, evalscript,
//! output raster), attaches the bearer token, and maps the provider's HTTP
//! statuses onto the [`UpstreamError`] taxonomy. The client is deliberately
//! retry-free: a 4xx is final, a 5xx or timeout is reported as unavailable
//! and left to the caller's transport policy.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::UpstreamError;
use crate::geo::BBox;

use super::token::TokenCache;

/// Output raster edge length in pixels for rendered tiles.
pub const TILE_OUTPUT_SIZE: u32 = 512;

/// Sentinel-2 L2A collection identifier in the Process API.
const DATA_COLLECTION: &str = "sentinel-2-l2a";

/// EPSG:4326 CRS identifier attached to request bounds.
const CRS_WGS84: &str = "http://www.opengis.net/def/crs/EPSG/0/4326";

/// How much of a provider 4xx body is carried into the error detail.
const MAX_ERROR_DETAIL_BYTES: usize = 512;

// =============================================================================
// Fetch Request / Response
// =============================================================================

/// A fully validated single-tile fetch, ready to send upstream.
///
/// Validation (date format, band selector) happens before one of these is
/// built, so constructing a request implies no further client-side checks.
#[derive(Debug, Clone)]
pub struct TileFetchRequest {
    pub bbox: BBox,

    /// Acquisition date, `YYYY-MM-DD`; expanded to the full UTC day
    pub date: String,

    /// Rendered evalscript for the requested band combination
    pub evalscript: String,
}

/// Raw image bytes returned by the provider.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Abstraction over the imagery provider.
///
/// The tile service and the preprocessing worker only depend on this trait,
/// which keeps them testable against an in-memory provider.
#[async_trait]
pub trait ImageryProvider: Send + Sync {
    /// Fetch the rendered image for one tile request.
    async fn fetch_tile(&self, request: &TileFetchRequest) -> Result<FetchedImage, UpstreamError>;
}

// =============================================================================
// Process API body
// =============================================================================

#[derive(Debug, Serialize)]
struct ProcessRequest<'a> {
    input: ProcessInput<'a>,
    output: ProcessOutput,
    evalscript: &'a str,
}

#[derive(Debug, Serialize)]
struct ProcessInput<'a> {
    bounds: ProcessBounds<'a>,
    data: Vec<ProcessData<'a>>,
}

#[derive(Debug, Serialize)]
struct ProcessBounds<'a> {
    bbox: [f64; 4],
    properties: BoundsProperties<'a>,
}

#[derive(Debug, Serialize)]
struct BoundsProperties<'a> {
    crs: &'a str,
}

#[derive(Debug, Serialize)]
struct ProcessData<'a> {
    #[serde(rename = "type")]
    collection: &'a str,
    #[serde(rename = "dataFilter")]
    data_filter: DataFilter,
}

#[derive(Debug, Serialize)]
struct DataFilter {
    #[serde(rename = "timeRange")]
    time_range: TimeRange,
}

#[derive(Debug, Serialize)]
struct TimeRange {
    from: String,
    to: String,
}

#[derive(Debug, Serialize)]
struct ProcessOutput {
    width: u32,
    height: u32,
    responses: Vec<OutputResponse>,
}

#[derive(Debug, Serialize)]
struct OutputResponse {
    identifier: &'static str,
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct OutputFormat {
    #[serde(rename = "type")]
    mime: &'static str,
}

/// Cap the provider detail carried in errors, respecting char boundaries.
fn truncate_detail(mut detail: String) -> String {
    if detail.len() > MAX_ERROR_DETAIL_BYTES {
        let mut cut = MAX_ERROR_DETAIL_BYTES;
        while !detail.is_char_boundary(cut) {
            cut -= 1;
        }
        detail.truncate(cut);
    }
    detail
}

fn process_body<'a>(request: &'a TileFetchRequest) -> ProcessRequest<'a> {
    ProcessRequest {
        input: ProcessInput {
            bounds: ProcessBounds {
                bbox: request.bbox.to_array(),
                properties: BoundsProperties { crs: CRS_WGS84 },
            },
            data: vec![ProcessData {
                collection: DATA_COLLECTION,
                data_filter: DataFilter {
                    time_range: TimeRange {
                        from: format!("{}T00:00:00Z", request.date),
                        to: format!("{}T23:59:59Z", request.date),
                    },
                },
            }],
        },
        output: ProcessOutput {
            width: TILE_OUTPUT_SIZE,
            height: TILE_OUTPUT_SIZE,
            responses: vec![OutputResponse {
                identifier: "default",
                format: OutputFormat { mime: "image/png" },
            }],
        },
        evalscript: &request.evalscript,
    }
}

// =============================================================================
// Sentinel Hub client
// =============================================================================

/// Production [`ImageryProvider`] talking to the Sentinel Hub Process API.
pub struct SentinelHubClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenCache,
}

impl SentinelHubClient {
    /// Create a client against `base_url` (no trailing slash needed),
    /// authenticating through `tokens`. The `reqwest::Client` should carry
    /// the configured per-call timeout.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, tokens: TokenCache) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn process_url(&self) -> String {
        format!("{}/api/v1/process", self.base_url)
    }
}

#[async_trait]
impl ImageryProvider for SentinelHubClient {
    async fn fetch_tile(&self, request: &TileFetchRequest) -> Result<FetchedImage, UpstreamError> {
        let token = self.tokens.get_token().await?;
        let body = process_body(request);

        let response = self
            .http
            .post(self.process_url())
            .bearer_auth(token)
            .header(header::ACCEPT, "image/png")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("image/png")
                .to_string();
            let bytes = response.bytes().await?;
            debug!(status = status.as_u16(), bytes = bytes.len(), "process request served");
            return Ok(FetchedImage { bytes, content_type });
        }

        if status.is_client_error() {
            let detail = truncate_detail(response.text().await.unwrap_or_default());
            warn!(status = status.as_u16(), %detail, "provider rejected process request");
            return Err(UpstreamError::Provider {
                status: status.as_u16(),
                detail,
            });
        }

        warn!(status = status.as_u16(), "provider unavailable");
        Err(UpstreamError::Unavailable {
            status: status.as_u16(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
