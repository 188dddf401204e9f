//! Signal bucket colours and circle sizes.
//!
//! Colours run blue (strongest) through cyan, green, yellow and orange to
//! red (weak), with black for cells where no signal was received.

use coverage_common::NO_SIGNAL_BUCKET;

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

pub const BLUE: Rgba = Rgba::opaque(0, 0, 255);
pub const CYAN: Rgba = Rgba::opaque(0, 255, 255);
pub const GREEN: Rgba = Rgba::opaque(0, 255, 0);
pub const YELLOW: Rgba = Rgba::opaque(255, 255, 0);
pub const ORANGE: Rgba = Rgba::opaque(255, 128, 0);
pub const RED: Rgba = Rgba::opaque(255, 0, 0);
pub const NO_SIGNAL: Rgba = Rgba::opaque(0, 0, 0);

/// Background of an empty tile.
pub const BACKGROUND: Rgba = Rgba::transparent();

/// Fill colour for a dominant bucket.
pub fn bucket_color(bucket: u8) -> Rgba {
    match bucket {
        0 => BLUE,
        1 => CYAN,
        2 => GREEN,
        3 => YELLOW,
        4 => ORANGE,
        b if b < NO_SIGNAL_BUCKET => RED,
        _ => NO_SIGNAL,
    }
}

/// Factor applied to the nominal circle radius for a dominant bucket.
///
/// Stronger buckets draw larger so they cover the gaps between cells.
pub fn radius_multiplier(bucket: u8) -> f32 {
    match bucket {
        0 => 1.6,
        1 => 1.5,
        2 => 1.4,
        3 => 1.3,
        4 => 1.2,
        b if b < NO_SIGNAL_BUCKET => 1.1,
        _ => 1.0,
    }
}
