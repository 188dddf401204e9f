//! Circles style: one disc per grid cell on a 3x3 working canvas.
//!
//! Discs near a tile edge spill into the neighbouring tiles. To keep tiles
//! seamless the whole 3x3 block around the requested tile is drawn and the
//! centre tile is cropped out.

use coverage_common::tile::zoom_scale;
use coverage_common::{circle_buffer, CoverageError, CoverageResult, Sample, TileCoord, TileRange, TileStyle};
use tiny_skia::{FillRule, IntRect, Paint, PathBuilder, Pixmap, Transform};
use tracing::debug;

use crate::canvas::{PaintQueue, RenderedTile};
use crate::palette::{bucket_color, radius_multiplier};
use crate::{TileRenderer, TILE_SIZE};

/// Edge of the working canvas in pixels.
pub const CANVAS_SIZE: u32 = TILE_SIZE * 3;

/// Radius that covers a whole base-zoom tile: half the diagonal of 256px.
pub const BASE_RADIUS: f32 = 181.0;

/// Smallest nominal radius in pixels.
pub const MIN_RADIUS: f32 = 6.0;

/// Canvas extent around the requested tile, in tile widths.
const CANVAS_BUFFER: f64 = 1.0;

/// Nominal radius at `zoom`, halved per zoom level below the base zoom.
pub fn nominal_radius(zoom: u32) -> f32 {
    (BASE_RADIUS / zoom_scale(zoom) as f32).max(MIN_RADIUS)
}

/// Base-zoom range covered by the working canvas of `coord`.
pub fn canvas_range(coord: &TileCoord) -> TileRange {
    coord.base_range(CANVAS_BUFFER)
}

/// Canvas pixel at the centre of a sample's grid cell.
pub fn sample_center(range: &TileRange, sample: &Sample) -> (f32, f32) {
    let size = CANVAS_SIZE as f64;
    (
        range.pixel_x(sample.x as f64 + 0.5, size) as f32,
        range.pixel_y(sample.y as f64 + 0.5, size) as f32,
    )
}

/// Renderer for the circles style.
#[derive(Debug, Clone, Copy, Default)]
pub struct CirclesRenderer;

impl CirclesRenderer {
    /// Draw the full 3x3 working canvas without cropping.
    pub fn render_canvas(&self, coord: &TileCoord, queue: &PaintQueue) -> CoverageResult<Pixmap> {
        let mut pixmap = Pixmap::new(CANVAS_SIZE, CANVAS_SIZE)
            .ok_or_else(|| CoverageError::Render("failed to allocate circles canvas".into()))?;

        let range = canvas_range(coord);
        let radius = nominal_radius(coord.z);

        let mut paint = Paint::default();
        paint.anti_alias = true;

        for sample in queue.iter() {
            let (cx, cy) = sample_center(&range, sample);
            let r = radius * radius_multiplier(sample.bucket);
            let Some(path) = PathBuilder::from_circle(cx, cy, r) else {
                continue;
            };
            paint.set_color(bucket_color(sample.bucket).to_skia());
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }

        Ok(pixmap)
    }
}

impl TileRenderer for CirclesRenderer {
    fn style(&self) -> TileStyle {
        TileStyle::Circles
    }

    fn query_buffer(&self, zoom: u32) -> f64 {
        circle_buffer(zoom)
    }

    fn render(&self, coord: &TileCoord, queue: &PaintQueue) -> CoverageResult<RenderedTile> {
        let canvas = self.render_canvas(coord, queue)?;

        let centre = IntRect::from_xywh(TILE_SIZE as i32, TILE_SIZE as i32, TILE_SIZE, TILE_SIZE)
            .ok_or_else(|| CoverageError::Render("invalid crop rectangle".into()))?;
        let tile = canvas
            .clone_rect(centre)
            .ok_or_else(|| CoverageError::Render("failed to crop circles canvas".into()))?;

        debug!(
            z = coord.z,
            x = coord.x,
            y = coord.y,
            samples = queue.len(),
            radius = nominal_radius(coord.z),
            "Rendered circles tile"
        );

        Ok(RenderedTile::from_pixmap(&tile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_radius_halves_per_zoom() {
        assert_eq!(nominal_radius(19), 181.0);
        assert_eq!(nominal_radius(18), 90.5);
        assert_eq!(nominal_radius(17), 45.25);
        assert_eq!(nominal_radius(10), MIN_RADIUS);
    }

    #[test]
    fn test_sample_center_at_base_zoom() {
        let coord = TileCoord::new(19, 10, 10).unwrap();
        let range = canvas_range(&coord);
        assert_eq!(range, TileRange::new(9, 9, 12, 12));
        assert_eq!(sample_center(&range, &Sample::new(10, 10, 0)), (384.0, 384.0));
        assert_eq!(sample_center(&range, &Sample::new(9, 11, 0)), (128.0, 640.0));
    }

    #[test]
    fn test_query_buffer_covers_largest_circle() {
        // The widest disc must not reach further than the query buffer.
        for zoom in 0..=19 {
            let reach_px = nominal_radius(zoom) * radius_multiplier(0);
            let buffer_px = CirclesRenderer.query_buffer(zoom) * TILE_SIZE as f64;
            assert!(
                buffer_px + 0.5 * TILE_SIZE as f64 / zoom_scale(zoom) >= reach_px as f64,
                "zoom {}: buffer {}px reach {}px",
                zoom,
                buffer_px,
                reach_px
            );
        }
    }
}
