//! Web-Mercator tile geometry.
//!
//! Conversions between z/x/y tile indices and WGS84 bounding boxes, plus
//! enumeration of the tile range covering a bounding box at a fixed zoom.
//! Pure math, no I/O.
//!
//! The tile scheme is the standard slippy-map addressing: longitude is
//! linear in `x / 2^z` over [-180, 180], latitude follows the inverse
//! Web-Mercator projection and saturates near the poles at ±85.0511°.

use std::f64::consts::PI;

use crate::error::ValidationError;

/// Highest zoom level accepted by the gateway.
pub const MAX_ZOOM: u8 = 22;

/// Latitude at which the Web-Mercator projection is cut off.
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.05112878;

// =============================================================================
// Bounding Box
// =============================================================================

/// A WGS84 bounding box in degrees.
///
/// Invariants (enforced by [`BBox::new`]): `min_lon < max_lon`,
/// `min_lat < max_lat`, longitudes within [-180, 180], latitudes within
/// [-90, 90]. Boxes derived from tiles never exceed ±85.0511° latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BBox {
    /// Validate and construct a bounding box.
    pub fn new(
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    ) -> Result<Self, ValidationError> {
        let finite = [min_lon, min_lat, max_lon, max_lat]
            .iter()
            .all(|v| v.is_finite());
        let in_range = (-180.0..=180.0).contains(&min_lon)
            && (-180.0..=180.0).contains(&max_lon)
            && (-90.0..=90.0).contains(&min_lat)
            && (-90.0..=90.0).contains(&max_lat);

        if !finite || !in_range || min_lon >= max_lon || min_lat >= max_lat {
            return Err(ValidationError::InvalidBBox {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
            });
        }

        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// The box as `[min_lon, min_lat, max_lon, max_lat]`, the order the
    /// provider's Process API expects.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }
}

// =============================================================================
// Tile Index
// =============================================================================

/// A z/x/y tile address in the Web-Mercator scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// Convert a tile address to its WGS84 bounding box.
///
/// Fails when `z > 22` or `x`/`y` fall outside `[0, 2^z)`. Latitude bounds
/// saturate at ±85.0511° by construction.
pub fn tile_to_bbox(z: u8, x: u32, y: u32) -> Result<BBox, ValidationError> {
    if z > MAX_ZOOM {
        return Err(ValidationError::InvalidTile { z, x, y });
    }
    let n = 1u64 << z;
    if u64::from(x) >= n || u64::from(y) >= n {
        return Err(ValidationError::InvalidTile { z, x, y });
    }

    let n = n as f64;
    let min_lon = (f64::from(x) / n) * 360.0 - 180.0;
    let max_lon = (f64::from(x + 1) / n) * 360.0 - 180.0;

    // Smaller y is further north
    let max_lat = tile_row_to_lat(f64::from(y), n);
    let min_lat = tile_row_to_lat(f64::from(y + 1), n);

    Ok(BBox {
        min_lon,
        min_lat,
        max_lon,
        max_lat,
    })
}

/// Latitude in degrees of the northern edge of tile row `y` at `n = 2^z`.
fn tile_row_to_lat(y: f64, n: f64) -> f64 {
    let lat_rad = (PI * (1.0 - 2.0 * y / n)).sinh().atan();
    lat_rad.to_degrees()
}

/// Enumerate the tile range whose boxes intersect `bbox` at `zoom`.
///
/// Rows and columns are clamped to `[0, 2^zoom - 1]`, so boxes reaching
/// past the projection cutoff still yield a valid range. Row-major order,
/// west to east, north to south. Callers are responsible for capping the
/// count before fanning out per-tile work.
pub fn tiles_for_bbox(bbox: &BBox, zoom: u8) -> Vec<TileIndex> {
    let n = 1u64 << zoom.min(MAX_ZOOM);
    let max_index = (n - 1) as u32;
    let n = n as f64;

    let col = |lon: f64| (((lon + 180.0) / 360.0 * n) as i64).clamp(0, max_index as i64) as u32;
    let row = |lat: f64| {
        let lat_rad = lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT).to_radians();
        let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;
        (y as i64).clamp(0, max_index as i64) as u32
    };

    let x_min = col(bbox.min_lon);
    let x_max = col(bbox.max_lon);
    // Row index grows southward, so the north edge gives the smaller row
    let y_min = row(bbox.max_lat);
    let y_max = row(bbox.min_lat);

    let mut tiles = Vec::with_capacity(
        ((x_max - x_min + 1) as usize) * ((y_max - y_min + 1) as usize),
    );
    for y in y_min..=y_max {
        for x in x_min..=x_max {
            tiles.push(TileIndex { z: zoom, x, y });
        }
    }
    tiles
}

// =============================================================================
// Tests
// =============================================================================
