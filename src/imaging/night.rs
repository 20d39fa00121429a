//! Night-lights background preparation.
//!
//! Raw night-lights mosaics are flat and evenly lit to the edge of the disk.
//! Before use they are darkened towards the limb and scaled by their own
//! brightness, so city lights stay visible while the dark ocean fades out:
//!
//! ```text
//! r  = distance from the centre, normalised so the inscribed circle is 1
//! d  = 1 − (0.99 · r)^10
//! l  = max(R, G, B) / 255
//! c' = min(255, ⌊c · d · l⌋)     for each colour channel, when alpha > 0
//! ```

use anyhow::{Context, Result};
use image::{RgbaImage, imageops};
use rayon::prelude::*;
use std::path::Path;

use crate::common::constants::{LIMB_DARKENING_EXPONENT, LIMB_DARKENING_RADIUS};
use crate::common::utils::private_path;

/// Apply limb darkening and resize to `size`×`size`.
pub fn prepare_night_background(source: &RgbaImage, size: u32) -> RgbaImage {
    let mut darkened = source.clone();
    apply_limb_darkening(&mut darkened);
    if darkened.dimensions() == (size, size) {
        darkened
    } else {
        imageops::resize(&darkened, size, size, imageops::FilterType::Lanczos3)
    }
}

/// Load a prepared night background, resizing it to the canonical size.
pub fn load_night_background(path: &Path, size: u32) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("Failed to open night background {}", private_path(path)))?
        .to_rgba8();
    if image.dimensions() == (size, size) {
        Ok(image)
    } else {
        Ok(imageops::resize(
            &image,
            size,
            size,
            imageops::FilterType::Lanczos3,
        ))
    }
}

fn apply_limb_darkening(image: &mut RgbaImage) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let row_len = width as usize * 4;

    image
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let ny = 2.0 * y as f64 / height as f64 - 1.0;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                if px[3] == 0 {
                    continue;
                }
                let nx = 2.0 * x as f64 / width as f64 - 1.0;
                let factor = limb_factor((nx * nx + ny * ny).sqrt());
                let lightness = px[0].max(px[1]).max(px[2]) as f64 / 255.0;
                for channel in &mut px[..3] {
                    *channel = (*channel as f64 * factor * lightness).clamp(0.0, 255.0) as u8;
                }
            }
        });
}

/// `1 − (0.99 · r)^10`; negative past the limb, which clamps channels to 0.
#[inline]
fn limb_factor(distance: f64) -> f64 {
    1.0 - (LIMB_DARKENING_RADIUS * distance).powi(LIMB_DARKENING_EXPONENT)
}
