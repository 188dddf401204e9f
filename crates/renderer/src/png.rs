//! PNG encoding for rendered tiles.
//!
//! Coverage tiles use a handful of palette colours plus anti-aliased edges,
//! so most of them fit an indexed PNG (colour type 3). Tiles with more than
//! 256 distinct RGBA values fall back to truecolour with alpha (type 6).

use std::collections::{HashMap, HashSet};
use std::io::Write;

use coverage_common::{CoverageError, CoverageResult};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rayon::prelude::*;

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

const COLOR_TYPE_INDEXED: u8 = 3;
const COLOR_TYPE_RGBA: u8 = 6;

/// Largest palette an 8-bit indexed PNG can carry.
const MAX_PALETTE_SIZE: usize = 256;

/// Pixel count above which palette extraction runs on the rayon pool.
const PARALLEL_THRESHOLD: usize = 4096;

/// An image reduced to a palette and one index byte per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedImage {
    pub palette: Vec<[u8; 4]>,
    pub indices: Vec<u8>,
}

impl IndexedImage {
    /// Build a palette for `pixels` (RGBA, 4 bytes each). `None` when the
    /// image has more than 256 distinct colours.
    pub fn from_rgba(pixels: &[u8]) -> Option<Self> {
        if pixels.len() / 4 >= PARALLEL_THRESHOLD {
            Self::from_rgba_parallel(pixels)
        } else {
            Self::from_rgba_sequential(pixels)
        }
    }

    fn from_rgba_sequential(pixels: &[u8]) -> Option<Self> {
        let mut lookup: HashMap<[u8; 4], u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
        let mut palette = Vec::new();
        let mut indices = Vec::with_capacity(pixels.len() / 4);

        for px in pixels.chunks_exact(4) {
            let color = [px[0], px[1], px[2], px[3]];
            let index = match lookup.get(&color) {
                Some(index) => *index,
                None => {
                    if palette.len() == MAX_PALETTE_SIZE {
                        return None;
                    }
                    let index = palette.len() as u8;
                    palette.push(color);
                    lookup.insert(color, index);
                    index
                }
            };
            indices.push(index);
        }

        Some(Self { palette, indices })
    }

    fn from_rgba_parallel(pixels: &[u8]) -> Option<Self> {
        let rows = (pixels.len() / 4 / rayon::current_num_threads()).max(256);

        // Distinct colours per chunk in first-seen order; a chunk that
        // already overflows the palette stops early.
        let per_chunk: Vec<Vec<[u8; 4]>> = pixels
            .par_chunks(rows * 4)
            .map(|chunk| {
                let mut seen = HashSet::with_capacity(MAX_PALETTE_SIZE);
                let mut ordered = Vec::new();
                for px in chunk.chunks_exact(4) {
                    let color = [px[0], px[1], px[2], px[3]];
                    if seen.insert(color) {
                        ordered.push(color);
                        if ordered.len() > MAX_PALETTE_SIZE {
                            break;
                        }
                    }
                }
                ordered
            })
            .collect();

        // Merging in chunk order gives the same palette as a sequential scan.
        let mut lookup: HashMap<[u8; 4], u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
        let mut palette = Vec::new();
        for color in per_chunk.into_iter().flatten() {
            if lookup.contains_key(&color) {
                continue;
            }
            if palette.len() == MAX_PALETTE_SIZE {
                return None;
            }
            lookup.insert(color, palette.len() as u8);
            palette.push(color);
        }

        let indices = pixels
            .par_chunks_exact(4)
            .map(|px| lookup.get(&[px[0], px[1], px[2], px[3]]).copied().unwrap_or(0))
            .collect();

        Some(Self { palette, indices })
    }
}

/// Encode RGBA pixels, picking indexed output whenever the colours fit.
pub fn encode_png(pixels: &[u8], width: usize, height: usize) -> CoverageResult<Vec<u8>> {
    if pixels.len() != width * height * 4 {
        return Err(CoverageError::Render(format!(
            "pixel buffer holds {} bytes, expected {} for {}x{}",
            pixels.len(),
            width * height * 4,
            width,
            height
        )));
    }

    match IndexedImage::from_rgba(pixels) {
        Some(image) => encode_indexed(&image, width, height),
        None => encode_rgba(pixels, width, height),
    }
}

/// Encode an indexed image, writing tRNS only when a colour is translucent.
pub fn encode_indexed(image: &IndexedImage, width: usize, height: usize) -> CoverageResult<Vec<u8>> {
    let mut out = start_png(width, height, COLOR_TYPE_INDEXED);

    let plte: Vec<u8> = image.palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    write_chunk(&mut out, b"PLTE", &plte);

    if image.palette.iter().any(|c| c[3] < 255) {
        let trns: Vec<u8> = image.palette.iter().map(|c| c[3]).collect();
        write_chunk(&mut out, b"tRNS", &trns);
    }

    let idat = compress_scanlines(&image.indices, width, height)?;
    write_chunk(&mut out, b"IDAT", &idat);
    write_chunk(&mut out, b"IEND", &[]);
    Ok(out)
}

/// Encode straight RGBA pixels as a truecolour PNG.
pub fn encode_rgba(pixels: &[u8], width: usize, height: usize) -> CoverageResult<Vec<u8>> {
    let mut out = start_png(width, height, COLOR_TYPE_RGBA);
    let idat = compress_scanlines(pixels, width * 4, height)?;
    write_chunk(&mut out, b"IDAT", &idat);
    write_chunk(&mut out, b"IEND", &[]);
    Ok(out)
}

fn start_png(width: usize, height: usize, color_type: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(1024);
    out.extend_from_slice(&SIGNATURE);

    let mut ihdr = [0u8; 13];
    ihdr[0..4].copy_from_slice(&(width as u32).to_be_bytes());
    ihdr[4..8].copy_from_slice(&(height as u32).to_be_bytes());
    ihdr[8] = 8; // bit depth
    ihdr[9] = color_type;
    // compression, filter and interlace methods stay 0
    write_chunk(&mut out, b"IHDR", &ihdr);
    out
}

/// Prefix each row with filter type 0 and zlib-compress the result.
fn compress_scanlines(data: &[u8], row_bytes: usize, height: usize) -> CoverageResult<Vec<u8>> {
    let mut raw = Vec::with_capacity(height * (row_bytes + 1));
    for row in data.chunks_exact(row_bytes).take(height) {
        raw.push(0);
        raw.extend_from_slice(row);
    }

    let compress = || -> std::io::Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&raw)?;
        encoder.finish()
    };
    compress().map_err(|e| CoverageError::Render(format!("IDAT compression failed: {}", e)))
}

fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);

    let mut crc = crc32fast::Hasher::new();
    crc.update(kind);
    crc.update(data);
    out.extend_from_slice(&crc.finalize().to_be_bytes());
}
