//! Packed RGBA8 frames and PNG output.
//!
//! Both backends produce images as one `u32` per cell, packed the way WGSL's
//! `pack4x8unorm` packs: red in the low byte, alpha in the high byte, each
//! channel `floor(0.5 + 255 * clamp(c, 0, 1))`.

use std::path::{Path, PathBuf};

use glam::Vec4;
use image::RgbaImage;

use crate::error::OutputError;
use crate::grid::GridSize;

/// Pack a colour into RGBA8, matching WGSL `pack4x8unorm`.
#[inline]
pub fn pack_rgba8(color: Vec4) -> u32 {
    let c = color.to_array();
    let mut packed = 0u32;
    for (i, v) in c.iter().enumerate() {
        let byte = (0.5 + 255.0 * v.clamp(0.0, 1.0)).floor() as u32;
        packed |= byte << (8 * i);
    }
    packed
}

/// Split a packed pixel into `[r, g, b, a]`.
#[inline]
pub fn unpack_rgba8(packed: u32) -> [u8; 4] {
    packed.to_le_bytes()
}

/// Convert a packed frame into an [`RgbaImage`].
pub fn to_rgba_image(size: GridSize, pixels: &[u32]) -> Result<RgbaImage, OutputError> {
    if pixels.len() != size.cells() {
        return Err(OutputError::SizeMismatch {
            expected: size.cells(),
            actual: pixels.len(),
        });
    }
    let raw: Vec<u8> = pixels.iter().flat_map(|p| unpack_rgba8(*p)).collect();
    RgbaImage::from_raw(size.width, size.height, raw).ok_or(OutputError::SizeMismatch {
        expected: size.cells(),
        actual: pixels.len(),
    })
}

/// Write a packed frame as PNG.
pub fn save_png(path: impl AsRef<Path>, size: GridSize, pixels: &[u32]) -> Result<(), OutputError> {
    let img = to_rgba_image(size, pixels)?;
    img.save_with_format(path.as_ref(), image::ImageFormat::Png)?;
    log::debug!("Wrote {}", path.as_ref().display());
    Ok(())
}

/// `<dir>/<stem>_<frame>.png` with the frame zero-padded to five digits.
pub fn frame_path(dir: &Path, stem: &str, frame: u64) -> PathBuf {
    dir.join(format!("{}_{:05}.png", stem, frame))
}
