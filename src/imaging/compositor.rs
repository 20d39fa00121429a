//! Final wallpaper composition.
//!
//! Layers, bottom to top:
//!
//! 1. opaque black canvas
//! 2. stars, anti-aliased white discs with an optional gaussian softening
//! 3. constellation edges at a single global alpha
//! 4. the Earth disk, centred
//!
//! Stars and edges are rasterised with tiny-skia into coverage masks, which
//! keeps overlapping shapes from accumulating brightness or alpha. Upper
//! layers are blended source-over into the colour channels only; the canvas
//! alpha stays at 255 throughout.

use image::{GrayImage, Luma, Rgba, RgbaImage, imageops};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use super::CanonicalDiskImage;
use crate::request::WallpaperRequest;
use crate::sky::{ProjectedEdge, Projection};

/// Edge stroke width per 1000 px of the longer side.
const EDGE_WIDTH_PER_KILOPIXEL: f32 = 1.0;

/// Compose a wallpaper. Panics on zero dimensions, which validated requests
/// never carry.
pub fn compose(
    disk: &CanonicalDiskImage,
    request: &WallpaperRequest,
    projection: &Projection,
    blur_sigma: f32,
) -> RgbaImage {
    let (width, height) = (request.width(), request.height());
    assert!(
        width > 0 && height > 0,
        "wallpaper dimensions must be positive, got {width}x{height}"
    );

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));

    if !projection.stars.is_empty() {
        let stars = star_layer(width, height, projection, blur_sigma);
        for (px, coverage) in canvas.pixels_mut().zip(stars.pixels()) {
            let level = coverage[0];
            px.0 = [level, level, level, 255];
        }
    }

    let line_alpha = (request.constellation_alpha() * 255.0).round() as u8;
    if !projection.edges.is_empty() && line_alpha > 0 {
        let overlay = edge_overlay(width, height, &projection.edges, line_alpha);
        blend_opaque(&mut canvas, &overlay, 0, 0);
    }

    let size = request.disk_size();
    if size > 0 {
        let earth = if disk.size() == size {
            disk.as_rgba().clone()
        } else {
            imageops::resize(disk.as_rgba(), size, size, imageops::FilterType::Lanczos3)
        };
        let x = (width as i64 - size as i64) / 2;
        let y = (height as i64 - size as i64) / 2;
        blend_opaque(&mut canvas, &earth, x, y);
    }

    canvas
}

/// Source-over blend of `layer` onto the opaque `canvas` with its top-left
/// corner at `(x, y)`. Parts of the layer outside the canvas are clipped.
fn blend_opaque(canvas: &mut RgbaImage, layer: &RgbaImage, x: i64, y: i64) {
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);
    for (lx, ly, src) in layer.enumerate_pixels() {
        let (cx, cy) = (x + lx as i64, y + ly as i64);
        if cx < 0 || cy < 0 || cx >= width || cy >= height {
            continue;
        }
        let alpha = src[3] as u32;
        if alpha == 0 {
            continue;
        }
        let dst = canvas.get_pixel_mut(cx as u32, cy as u32);
        for c in 0..3 {
            let mixed = src[c] as u32 * alpha + dst[c] as u32 * (255 - alpha);
            dst[c] = ((mixed + 127) / 255) as u8;
        }
        dst[3] = 255;
    }
}

fn blank_pixmap(width: u32, height: u32) -> Pixmap {
    Pixmap::new(width, height).expect("pixmap dimensions are positive and bounded by the request")
}

fn white_paint() -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(255, 255, 255, 255);
    paint.anti_alias = true;
    paint
}

/// Star coverage as a grayscale mask, blurred when `blur_sigma > 0`.
fn star_layer(width: u32, height: u32, projection: &Projection, blur_sigma: f32) -> GrayImage {
    let mut pixmap = blank_pixmap(width, height);
    let paint = white_paint();

    for star in &projection.stars {
        if let Some(circle) =
            PathBuilder::from_circle(star.x as f32, star.y as f32, star.radius as f32)
        {
            pixmap.fill_path(
                &circle,
                &paint,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    let coverage = coverage_mask(&pixmap, width, height);
    if blur_sigma > 0.0 {
        imageops::blur(&coverage, blur_sigma)
    } else {
        coverage
    }
}

/// White edges whose alpha is their coverage scaled by `line_alpha`.
fn edge_overlay(width: u32, height: u32, edges: &[ProjectedEdge], line_alpha: u8) -> RgbaImage {
    let mut pixmap = blank_pixmap(width, height);
    let paint = white_paint();
    let stroke = Stroke {
        width: (width.max(height) as f32 / 1000.0 * EDGE_WIDTH_PER_KILOPIXEL).max(1.0),
        ..Stroke::default()
    };

    let mut builder = PathBuilder::new();
    for edge in edges {
        builder.move_to(edge.from.0 as f32, edge.from.1 as f32);
        builder.line_to(edge.to.0 as f32, edge.to.1 as f32);
    }
    if let Some(path) = builder.finish() {
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    let coverage = coverage_mask(&pixmap, width, height);
    RgbaImage::from_fn(width, height, |x, y| {
        let c = coverage.get_pixel(x, y)[0] as u16;
        Rgba([255, 255, 255, (c * line_alpha as u16 / 255) as u8])
    })
}

fn coverage_mask(pixmap: &Pixmap, width: u32, height: u32) -> GrayImage {
    let alpha: Vec<u8> = pixmap.pixels().iter().map(|px| px.alpha()).collect();
    GrayImage::from_raw(width, height, alpha)
        .unwrap_or_else(|| GrayImage::from_pixel(width, height, Luma([0])))
}
