//! Draw-order queue and rendered tile buffer.

use coverage_common::{CoverageResult, Sample};
use tiny_skia::Pixmap;

use crate::palette::Rgba;
use crate::png;

/// Samples in paint order: weakest bucket first, strongest last.
///
/// Overlapping shapes composite by paint order, so the renderers only accept
/// samples through this type. Samples with the same bucket keep their input
/// order.
#[derive(Debug, Clone, Default)]
pub struct PaintQueue {
    samples: Vec<Sample>,
}

impl PaintQueue {
    pub fn new(mut samples: Vec<Sample>) -> Self {
        samples.sort_by(|a, b| b.bucket.cmp(&a.bucket));
        Self { samples }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }
}

impl FromIterator<Sample> for PaintQueue {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A rendered tile as straight (non-premultiplied) RGBA pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTile {
    pub width: u32,
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel), row-major from the top-left.
    pub pixels: Vec<u8>,
}

impl RenderedTile {
    /// Copy a premultiplied pixmap into a straight RGBA buffer.
    pub fn from_pixmap(pixmap: &Pixmap) -> Self {
        let mut pixels = Vec::with_capacity(pixmap.pixels().len() * 4);
        for pixel in pixmap.pixels() {
            let color = pixel.demultiply();
            pixels.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }

        Self {
            width: pixmap.width(),
            height: pixmap.height(),
            pixels,
        }
    }

    /// Colour at pixel (x, y). Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        let idx = ((y * self.width + x) * 4) as usize;
        Rgba::new(
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        )
    }

    /// Whether nothing was drawn.
    pub fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(4).all(|p| p[3] == 0)
    }

    /// Encode as PNG.
    pub fn encode_png(&self) -> CoverageResult<Vec<u8>> {
        png::encode_png(&self.pixels, self.width as usize, self.height as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_orders_weakest_first() {
        let queue = PaintQueue::new(vec![
            Sample::new(0, 0, 0),
            Sample::new(1, 0, 12),
            Sample::new(2, 0, 4),
            Sample::new(3, 0, 11),
        ]);
        let buckets: Vec<u8> = queue.iter().map(|s| s.bucket).collect();
        assert_eq!(buckets, vec![12, 11, 4, 0]);
    }

    #[test]
    fn test_queue_is_stable_within_bucket() {
        let queue: PaintQueue = vec![
            Sample::new(5, 5, 3),
            Sample::new(1, 1, 7),
            Sample::new(6, 6, 3),
        ]
        .into_iter()
        .collect();
        let xs: Vec<i64> = queue.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![1, 5, 6]);
    }

    #[test]
    fn test_from_pixmap_demultiplies() {
        let mut pixmap = Pixmap::new(2, 1).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(255, 0, 0, 255));
        let tile = RenderedTile::from_pixmap(&pixmap);
        assert_eq!(tile.pixel(1, 0), Rgba::opaque(255, 0, 0));
        assert!(!tile.is_blank());
    }
}
