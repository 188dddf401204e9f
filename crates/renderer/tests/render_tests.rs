//! Tests for the circles and blocks renderers.
//!
//! Covers pixel placement, paint order, seams between neighbouring tiles
//! and PNG output decoded back through the `image` crate.

use coverage_common::{Sample, TileCoord, TileStyle, NO_SIGNAL_BUCKET};
use renderer::palette::{BACKGROUND, BLUE, NO_SIGNAL, RED};
use renderer::{renderer_for, BlocksRenderer, CirclesRenderer, PaintQueue, RenderedTile, TileRenderer};

// ============================================================================
// Helper functions
// ============================================================================

fn coord(z: u32, x: u32, y: u32) -> TileCoord {
    TileCoord::new(z, x, y).unwrap()
}

fn render(renderer: &dyn TileRenderer, coord: TileCoord, samples: Vec<Sample>) -> RenderedTile {
    renderer.render(&coord, &PaintQueue::new(samples)).unwrap()
}

fn decode(png: &[u8]) -> image::RgbaImage {
    image::load_from_memory(png).unwrap().to_rgba8()
}

// ============================================================================
// Style dispatch
// ============================================================================

#[test]
fn test_renderer_for_style() {
    assert_eq!(renderer_for(TileStyle::Circles).style(), TileStyle::Circles);
    assert_eq!(renderer_for(TileStyle::Blocks).style(), TileStyle::Blocks);
    assert_eq!(renderer_for(TileStyle::Blocks).query_buffer(19), 0.0);
    assert_eq!(renderer_for(TileStyle::Circles).query_buffer(19), 1.0);
}

// ============================================================================
// Circles
// ============================================================================

#[test]
fn test_circles_no_signal_at_center() {
    let tile = render(
        &CirclesRenderer,
        coord(19, 10, 10),
        vec![Sample::new(10, 10, NO_SIGNAL_BUCKET)],
    );
    assert_eq!(tile.width, 256);
    assert_eq!(tile.height, 256);
    assert_eq!(tile.pixel(128, 128), NO_SIGNAL);
}

#[test]
fn test_circles_strongest_bucket_is_blue() {
    let tile = render(&CirclesRenderer, coord(19, 10, 10), vec![Sample::new(10, 10, 0)]);
    assert_eq!(tile.pixel(128, 128), BLUE);
    // radius 181 * 1.6 reaches every corner of the tile
    assert_eq!(tile.pixel(0, 0), BLUE);
    assert_eq!(tile.pixel(255, 255), BLUE);
}

#[test]
fn test_circles_small_disc_leaves_background() {
    // At zoom 12 the disc is clamped to the 6px minimum radius
    let c = coord(12, 2170, 1345);
    let range = c.base_range(0.0);
    // 128 cells per tile, so each cell is 2px wide
    let x = range.x_min + 64;
    let y = range.y_min + 64;

    let tile = render(&CirclesRenderer, c, vec![Sample::new(x, y, 3)]);
    assert_eq!(tile.pixel(128, 128).a, 255);
    assert_eq!(tile.pixel(0, 0), BACKGROUND);
    assert_eq!(tile.pixel(128, 150), BACKGROUND);
}

#[test]
fn test_circles_stronger_sample_paints_on_top() {
    let weak_first = vec![Sample::new(10, 10, NO_SIGNAL_BUCKET), Sample::new(11, 10, 0)];
    let strong_first = vec![Sample::new(11, 10, 0), Sample::new(10, 10, NO_SIGNAL_BUCKET)];

    for samples in [weak_first, strong_first] {
        let tile = render(&CirclesRenderer, coord(19, 10, 10), samples);
        // Both discs cover the centre; the blue one must win
        assert_eq!(tile.pixel(128, 128), BLUE);
    }
}

#[test]
fn test_circles_spill_matches_across_tile_edge() {
    let sample = Sample::new(11, 10, 5);
    let left = render(&CirclesRenderer, coord(19, 10, 10), vec![sample]);
    let right = render(&CirclesRenderer, coord(19, 11, 10), vec![sample]);

    // Rows either side of the shared edge carry the same disc
    for y in [64, 128, 192] {
        assert_eq!(left.pixel(255, y), RED);
        assert_eq!(right.pixel(0, y), RED);
    }
}

#[test]
fn test_circles_edges_are_anti_aliased() {
    // Disc of radius 90.5 centred at pixel (64, 64)
    let tile = render(&CirclesRenderer, coord(18, 5, 5), vec![Sample::new(10, 10, NO_SIGNAL_BUCKET)]);
    assert_eq!(tile.pixel(64, 64), NO_SIGNAL);
    assert_eq!(tile.pixel(200, 200), BACKGROUND);
    let partial = (0..256)
        .flat_map(|y| (0..256).map(move |x| (x, y)))
        .filter(|(x, y)| {
            let a = tile.pixel(*x, *y).a;
            a > 0 && a < 255
        })
        .count();
    assert!(partial > 0);
}

// ============================================================================
// Blocks
// ============================================================================

#[test]
fn test_blocks_fill_whole_tile_at_base_zoom() {
    let tile = render(&BlocksRenderer, coord(19, 10, 10), vec![Sample::new(10, 10, NO_SIGNAL_BUCKET)]);
    assert_eq!(tile.pixel(0, 0), NO_SIGNAL);
    assert_eq!(tile.pixel(128, 128), NO_SIGNAL);
    assert_eq!(tile.pixel(255, 255), NO_SIGNAL);
}

#[test]
fn test_blocks_quadrant_one_zoom_up() {
    // Tile 18/5/5 covers cells 10..12; cell (11, 10) is its top-right quadrant
    let tile = render(&BlocksRenderer, coord(18, 5, 5), vec![Sample::new(11, 10, 0)]);
    assert_eq!(tile.pixel(200, 50), BLUE);
    assert_eq!(tile.pixel(128, 0), BLUE);
    assert_eq!(tile.pixel(127, 50), BACKGROUND);
    assert_eq!(tile.pixel(200, 128), BACKGROUND);
}

#[test]
fn test_blocks_snap_to_eight_pixel_grid() {
    // At zoom 12 one cell is 2px wide; cell x_min + 5 starts at pixel 10
    let c = coord(12, 2170, 1345);
    let range = c.base_range(0.0);
    let tile = render(&BlocksRenderer, c, vec![Sample::new(range.x_min + 5, range.y_min, 1)]);

    assert_eq!(tile.pixel(7, 0), BACKGROUND);
    assert_eq!(tile.pixel(8, 0).a, 255);
    assert_eq!(tile.pixel(15, 7).a, 255);
    assert_eq!(tile.pixel(16, 0), BACKGROUND);
    assert_eq!(tile.pixel(8, 8), BACKGROUND);
}

#[test]
fn test_blocks_ignore_buffer_cells() {
    let tile = render(&BlocksRenderer, coord(19, 10, 10), vec![Sample::new(9, 10, 0)]);
    assert!(tile.is_blank());
}

// ============================================================================
// PNG output
// ============================================================================

#[test]
fn test_empty_queue_renders_transparent_png() {
    for style in [TileStyle::Circles, TileStyle::Blocks] {
        let tile = render(renderer_for(style), coord(14, 9050, 9835), Vec::new());
        assert!(tile.is_blank());

        let decoded = decode(&tile.encode_png().unwrap());
        assert_eq!(decoded.dimensions(), (256, 256));
        assert!(decoded.pixels().all(|p| p.0[3] == 0));
    }
}

#[test]
fn test_png_round_trips_rendered_pixels() {
    let samples = vec![
        Sample::new(10, 10, 2),
        Sample::new(11, 11, 7),
        Sample::new(9, 10, NO_SIGNAL_BUCKET),
    ];
    let tile = render(&CirclesRenderer, coord(19, 10, 10), samples);
    let decoded = decode(&tile.encode_png().unwrap());
    assert_eq!(decoded.into_raw(), tile.pixels);
}
