//! Raster pipeline: preprocessing fetched disks, preparing night backgrounds
//! and compositing wallpapers.

pub mod compositor;
pub mod night;
pub mod preprocess;

use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

pub use compositor::compose;
pub use night::{load_night_background, prepare_night_background};
pub use preprocess::preprocess;

/// Raster as fetched (stitched from tiles when the source is tiled).
pub type RawDiskImage = RgbaImage;

/// Square RGBA disk with the circular mask and luminance alpha applied.
/// The only artifact persisted in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalDiskImage {
    image: RgbaImage,
}

impl CanonicalDiskImage {
    /// Wrap a raster. `None` unless it is square and non-empty.
    pub fn from_rgba(image: RgbaImage) -> Option<Self> {
        (image.width() > 0 && image.width() == image.height()).then_some(Self { image })
    }

    pub fn size(&self) -> u32 {
        self.image.width()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        encode_png(&self.image)
    }

    pub fn decode_png(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
        let (width, height) = image.dimensions();
        Self::from_rgba(image).ok_or_else(|| {
            image::ImageError::Parameter(image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::Generic(format!(
                    "cached disk is {width}x{height}, expected a square"
                )),
            ))
        })
    }
}

/// Encode an RGBA raster as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Whether the centre of pixel `(x, y)` lies inside the disk inscribed in a
/// `size`×`size` square.
#[inline]
pub(crate) fn inside_disk(x: u32, y: u32, size: u32) -> bool {
    let radius = size as f64 / 2.0;
    let dx = x as f64 + 0.5 - radius;
    let dy = y as f64 + 0.5 - radius;
    dx * dx + dy * dy <= radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_disk_corners_and_centre() {
        assert!(inside_disk(8, 8, 16));
        assert!(!inside_disk(0, 0, 16));
        assert!(!inside_disk(15, 15, 16));
        assert!(inside_disk(0, 8, 16));
    }

    #[test]
    fn test_canonical_requires_square() {
        assert!(CanonicalDiskImage::from_rgba(RgbaImage::new(4, 5)).is_none());
        assert!(CanonicalDiskImage::from_rgba(RgbaImage::new(0, 0)).is_none());
        assert_eq!(
            CanonicalDiskImage::from_rgba(RgbaImage::new(4, 4))
                .unwrap()
                .size(),
            4
        );
    }

    #[test]
    fn test_png_round_trip_preserves_pixels() {
        let mut image = RgbaImage::new(3, 3);
        image.put_pixel(1, 1, image::Rgba([10, 20, 30, 40]));
        let disk = CanonicalDiskImage::from_rgba(image).unwrap();
        let decoded = CanonicalDiskImage::decode_png(&disk.encode_png().unwrap()).unwrap();
        assert_eq!(decoded, disk);
    }
}
