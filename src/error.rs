use thiserror::Error;

/// Input validation failures, always raised before any network call.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// Tile coordinates outside the Web-Mercator tile scheme
    #[error("Invalid tile coordinates z={z} x={x} y={y}: zoom must be 0-22 and x/y in [0, 2^z)")]
    InvalidTile { z: u8, x: u32, y: u32 },

    /// Bounding box with inverted or out-of-range extents
    #[error(
        "Invalid bounding box [{min_lon}, {min_lat}, {max_lon}, {max_lat}]: \
         expected min < max with lon in [-180, 180] and lat in [-90, 90]"
    )]
    InvalidBBox {
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    },

    /// Date not in strict `YYYY-MM-DD` form
    #[error("Invalid date {value:?}: expected YYYY-MM-DD")]
    InvalidDate { value: String },

    /// Band selector naming a band with no Sentinel-2 mapping
    #[error("Unknown band {band:?} in selector (supported: RGB, RED, GREEN, BLUE, NIR, SWIR)")]
    UnknownBand { band: String },

    /// Empty band selector (e.g. `bands=` or `bands=,`)
    #[error("Band selector must name at least one band")]
    EmptyBands,
}

/// Failures talking to the imagery provider or its token endpoint.
///
/// None of these are retried inside the gateway; retry policy, if any,
/// belongs to a transport layer outside this crate.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// Token endpoint answered outside 2xx (maps to HTTP 502)
    #[error("OAuth token exchange failed with status {status}")]
    TokenExchange { status: u16 },

    /// Provider rejected the request with a 4xx; passed through as a
    /// client error with the provider's detail attached
    #[error("Imagery provider rejected the request ({status}): {detail}")]
    Provider { status: u16, detail: String },

    /// Provider 5xx (maps to HTTP 502)
    #[error("Imagery provider unavailable (status {status})")]
    Unavailable { status: u16 },

    /// Per-call timeout elapsed (maps to HTTP 503)
    #[error("Imagery provider request timed out")]
    Timeout,

    /// Connection-level failure before any status was received
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

/// Errors surfaced by the single-tile request path.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}
