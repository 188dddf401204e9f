//! Raster rendering of coverage samples.
//!
//! Implements the two tile styles:
//! - Circles: overlapping discs, sized and coloured by signal bucket
//! - Blocks: one filled square per grid cell
//!
//! Both renderers only accept a [`PaintQueue`], which fixes the draw order
//! so that stronger signal is painted over weaker signal.

pub mod blocks;
pub mod canvas;
pub mod circles;
pub mod palette;
pub mod png;

use coverage_common::{CoverageResult, TileCoord, TileStyle};

pub use blocks::BlocksRenderer;
pub use canvas::{PaintQueue, RenderedTile};
pub use circles::CirclesRenderer;
pub use palette::{bucket_color, Rgba};

/// Output tile edge in pixels.
pub const TILE_SIZE: u32 = 256;

/// A tile style that can turn samples into pixels.
pub trait TileRenderer: Send + Sync {
    /// Style this renderer draws.
    fn style(&self) -> TileStyle;

    /// Query buffer, in tile widths, needed to catch every sample that can
    /// paint into a tile at `zoom`.
    fn query_buffer(&self, zoom: u32) -> f64;

    /// Draw the queued samples for `coord`.
    fn render(&self, coord: &TileCoord, queue: &PaintQueue) -> CoverageResult<RenderedTile>;
}

/// Renderer for a tile style.
pub fn renderer_for(style: TileStyle) -> &'static dyn TileRenderer {
    static CIRCLES: CirclesRenderer = CirclesRenderer;
    static BLOCKS: BlocksRenderer = BlocksRenderer;

    match style {
        TileStyle::Circles => &CIRCLES,
        TileStyle::Blocks => &BLOCKS,
    }
}
