//! Raw disk to canonical disk.
//!
//! 1. Lanczos3 resize to `size`×`size`
//! 2. hard circular mask of radius `size / 2`
//! 3. luminance alpha `min(255, 10 × max(R, G, B))`, so the night side fades out
//! 4. composite over the (masked) night background, or over a black disk
//!
//! Pure and deterministic: identical input bytes give identical output.

use image::{Rgba, RgbaImage, imageops};
use rayon::prelude::*;

use super::{CanonicalDiskImage, inside_disk};
use crate::common::constants::LUMINANCE_ALPHA_GAIN;
use crate::error::PreprocessError;

/// Turn a fetched raster into the canonical cached disk.
pub fn preprocess(
    raw: &RgbaImage,
    night: Option<&RgbaImage>,
    size: u32,
) -> Result<CanonicalDiskImage, PreprocessError> {
    if raw.width() == 0 || raw.height() == 0 {
        return Err(PreprocessError::EmptyRaster);
    }
    if size == 0 {
        return Err(PreprocessError::ZeroSize);
    }

    let mut day = resize_square(raw, size);
    shape_alpha(&mut day);

    let mut base = match night {
        Some(night) if night.width() > 0 && night.height() > 0 => {
            let mut base = resize_square(night, size);
            apply_mask(&mut base);
            base
        }
        _ => black_disk(size),
    };

    imageops::overlay(&mut base, &day, 0, 0);

    CanonicalDiskImage::from_rgba(base).ok_or(PreprocessError::ZeroSize)
}

/// Day-side alpha of a pixel.
#[inline]
pub fn luminance_alpha(r: u8, g: u8, b: u8) -> u8 {
    let peak = r.max(g).max(b) as u16;
    (peak * LUMINANCE_ALPHA_GAIN).min(255) as u8
}

fn resize_square(image: &RgbaImage, size: u32) -> RgbaImage {
    if image.dimensions() == (size, size) {
        image.clone()
    } else {
        imageops::resize(image, size, size, imageops::FilterType::Lanczos3)
    }
}

/// Mask and luminance alpha in one row-parallel pass.
fn shape_alpha(image: &mut RgbaImage) {
    let size = image.width();
    let row_len = size as usize * 4;
    image
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                px[3] = if inside_disk(x as u32, y as u32, size) {
                    luminance_alpha(px[0], px[1], px[2])
                } else {
                    0
                };
            }
        });
}

/// Zero alpha outside the disk, keep it inside.
fn apply_mask(image: &mut RgbaImage) {
    let size = image.width();
    let row_len = size as usize * 4;
    image
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                if !inside_disk(x as u32, y as u32, size) {
                    px[3] = 0;
                }
            }
        });
}

fn black_disk(size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        if inside_disk(x, y, size) {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}
