//! Quadtree tile coordinates and the transform to base-zoom index ranges.
//!
//! Grid cells are aggregated at a single fixed zoom level ([`BASE_ZOOM`]).
//! A tile at a coarser zoom covers a square block of base-zoom cells whose
//! bounds are found by doubling the tile's corner coordinates once per zoom
//! step:
//!
//! ```text
//!   +-----------+-----------+
//!   |   2x,2y   |  2x+1,2y  |
//!   +-----------+-----------+
//!   |  2x,2y+1  | 2x+1,2y+1 |
//!   +-----------+-----------+
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoverageError, CoverageResult};

/// The zoom level at which grid cells are aggregated.
pub const BASE_ZOOM: u32 = 19;

/// Smallest query buffer (in tile widths) for circle tiles.
///
/// The minimum circle radius is 6px scaled by the largest bucket multiplier
/// (1.6), i.e. 9.6px, which is 0.0375 of a 256px tile.
pub const MIN_CIRCLE_BUFFER: f64 = 0.0375;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    /// Create a validated tile coordinate.
    ///
    /// The zoom must not exceed [`BASE_ZOOM`] and x/y must lie inside the
    /// `2^z` by `2^z` tile matrix of that zoom.
    pub fn new(z: u32, x: u32, y: u32) -> CoverageResult<Self> {
        if z > BASE_ZOOM {
            return Err(CoverageError::invalid(
                "z",
                format!("zoom {} exceeds maximum {}", z, BASE_ZOOM),
            ));
        }
        let n = 1u32 << z;
        if x >= n {
            return Err(CoverageError::invalid(
                "x",
                format!("column {} outside 0..{} at zoom {}", x, n, z),
            ));
        }
        if y >= n {
            return Err(CoverageError::invalid(
                "y",
                format!("row {} outside 0..{} at zoom {}", y, n, z),
            ));
        }
        Ok(Self { z, x, y })
    }

    /// Generate a cache key string.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }

    /// Base-zoom index range covered by this tile, grown by `buffer` tile
    /// widths on every side.
    pub fn base_range(&self, buffer: f64) -> TileRange {
        range_at(self.x as i64, self.y as i64, self.z, buffer)
    }

    /// Get the parent tile (zoom - 1).
    pub fn parent(&self) -> Option<TileCoord> {
        if self.z == 0 {
            return None;
        }
        Some(TileCoord {
            z: self.z - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }
}

/// A rectangle of base-zoom cell indices, half-open on the max side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRange {
    pub x_min: i64,
    pub y_min: i64,
    pub x_max: i64,
    pub y_max: i64,
}

impl TileRange {
    pub fn new(x_min: i64, y_min: i64, x_max: i64, y_max: i64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Number of base-zoom columns in the range.
    pub fn width(&self) -> i64 {
        self.x_max - self.x_min
    }

    /// Number of base-zoom rows in the range.
    pub fn height(&self) -> i64 {
        self.y_max - self.y_min
    }

    /// Whether the base-zoom cell (x, y) lies inside the range.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x_min && x < self.x_max && y >= self.y_min && y < self.y_max
    }

    /// Map a base-zoom index to a canvas pixel offset along x.
    ///
    /// `pixel = ((index - min) / width) * canvas_size`
    pub fn pixel_x(&self, index: f64, canvas_size: f64) -> f64 {
        ((index - self.x_min as f64) / self.width() as f64) * canvas_size
    }

    /// Map a base-zoom index to a canvas pixel offset along y.
    pub fn pixel_y(&self, index: f64, canvas_size: f64) -> f64 {
        ((index - self.y_min as f64) / self.height() as f64) * canvas_size
    }
}

/// Number of base-zoom cells along one edge of a tile at `zoom`.
pub fn zoom_scale(zoom: u32) -> f64 {
    let mut scale = 1.0;
    for _ in zoom..BASE_ZOOM {
        scale *= 2.0;
    }
    scale
}

/// Compute the base-zoom index range covered by tile (x_outer, y_outer) at
/// `zoom`, grown by `buffer` tile widths on every side.
///
/// Bounds start in the outer tile's own units and are doubled once per zoom
/// step up to [`BASE_ZOOM`]; the lower bounds are then floored and the upper
/// bounds ceiled. With `buffer = 0` the result is the exact cell coverage.
pub fn range_at(x_outer: i64, y_outer: i64, zoom: u32, buffer: f64) -> TileRange {
    let mut x_nw = x_outer as f64 - buffer;
    let mut y_nw = y_outer as f64 - buffer;
    let mut x_se = x_outer as f64 + 1.0 + buffer;
    let mut y_se = y_outer as f64 + 1.0 + buffer;

    for _ in zoom..BASE_ZOOM {
        x_nw *= 2.0;
        y_nw *= 2.0;
        x_se *= 2.0;
        y_se *= 2.0;
    }

    TileRange {
        x_min: x_nw.floor() as i64,
        y_min: y_nw.floor() as i64,
        x_max: x_se.ceil() as i64,
        y_max: y_se.ceil() as i64,
    }
}

/// Query buffer for circle tiles at `zoom`, in tile widths.
///
/// One base-zoom cell expressed in outer-tile units, floored at
/// [`MIN_CIRCLE_BUFFER`]:
///
/// | zoom | buffer |
/// |------|--------|
/// | 19   | 1      |
/// | 18   | 0.5    |
/// | 17   | 0.25   |
/// | 15   | 0.0625 |
/// | <=14 | 0.0375 |
pub fn circle_buffer(zoom: u32) -> f64 {
    (1.0 / zoom_scale(zoom)).max(MIN_CIRCLE_BUFFER)
}
