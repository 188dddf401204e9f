//! Blocks style: one filled square per grid cell, no overlap between cells.

use coverage_common::tile::zoom_scale;
use coverage_common::{CoverageError, CoverageResult, Sample, TileCoord, TileRange, TileStyle};
use tiny_skia::{Paint, Pixmap, Rect, Transform};
use tracing::debug;

use crate::canvas::{PaintQueue, RenderedTile};
use crate::palette::bucket_color;
use crate::{TileRenderer, TILE_SIZE};

/// Block edge at the base zoom, one cell per tile.
pub const BASE_BLOCK_SIZE: f32 = TILE_SIZE as f32;

/// Smallest block edge in pixels. Once reached, block origins snap to this
/// grid so neighbouring blocks stay aligned.
pub const MIN_BLOCK_SIZE: f32 = 8.0;

/// Block edge in pixels at `zoom`.
pub fn block_size(zoom: u32) -> f32 {
    (BASE_BLOCK_SIZE / zoom_scale(zoom) as f32).max(MIN_BLOCK_SIZE)
}

/// Top-left pixel of a sample's block.
pub fn block_origin(range: &TileRange, sample: &Sample, size: f32) -> (f32, f32) {
    let canvas = TILE_SIZE as f64;
    let mut px = range.pixel_x(sample.x as f64, canvas) as f32;
    let mut py = range.pixel_y(sample.y as f64, canvas) as f32;

    if size <= MIN_BLOCK_SIZE {
        px = (px / MIN_BLOCK_SIZE).floor() * MIN_BLOCK_SIZE;
        py = (py / MIN_BLOCK_SIZE).floor() * MIN_BLOCK_SIZE;
    }

    (px, py)
}

/// Renderer for the blocks style.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlocksRenderer;

impl TileRenderer for BlocksRenderer {
    fn style(&self) -> TileStyle {
        TileStyle::Blocks
    }

    fn query_buffer(&self, _zoom: u32) -> f64 {
        0.0
    }

    fn render(&self, coord: &TileCoord, queue: &PaintQueue) -> CoverageResult<RenderedTile> {
        let mut pixmap = Pixmap::new(TILE_SIZE, TILE_SIZE)
            .ok_or_else(|| CoverageError::Render("failed to allocate blocks canvas".into()))?;

        let range = coord.base_range(self.query_buffer(coord.z));
        let size = block_size(coord.z);

        let mut paint = Paint::default();
        paint.anti_alias = false;

        for sample in queue.iter() {
            let (px, py) = block_origin(&range, sample, size);
            let Some(rect) = Rect::from_xywh(px, py, size, size) else {
                continue;
            };
            paint.set_color(bucket_color(sample.bucket).to_skia());
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }

        debug!(
            z = coord.z,
            x = coord.x,
            y = coord.y,
            samples = queue.len(),
            block_size = size,
            "Rendered blocks tile"
        );

        Ok(RenderedTile::from_pixmap(&pixmap))
    }
}
