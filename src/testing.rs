//! Synthetic fixtures for unit and integration tests.
//!
//! Compiled for `cfg(test)` and with the `testing-support` feature, which the
//! integration tests enable through the self dev-dependency.

use chrono::{DateTime, Utc};
use image::{Rgba, RgbaImage};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::acquisition::{ImageSource, Tile};
use crate::cache::AcquisitionTarget;
use crate::error::FetchError;
use crate::imaging::{CanonicalDiskImage, encode_png, preprocess};
use crate::sky::{Ephemeris, SkySnapshot};
use crate::time::SimulatedTimeSource;

/// A lit disk on black, brightest towards the upper left.
pub fn synthetic_disk_raster(size: u32) -> RgbaImage {
    let radius = size as f64 / 2.0;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f64 + 0.5 - radius;
        let dy = y as f64 + 0.5 - radius;
        if dx * dx + dy * dy > radius * radius {
            return Rgba([0, 0, 0, 255]);
        }
        let light = 1.0 - (x + y) as f64 / (2.0 * size as f64);
        Rgba([
            (40.0 + 120.0 * light) as u8,
            (70.0 + 130.0 * light) as u8,
            (120.0 + 135.0 * light) as u8,
            255,
        ])
    })
}

/// `synthetic_disk_raster` run through the preprocessor.
pub fn synthetic_canonical_disk(size: u32) -> CanonicalDiskImage {
    let raw = synthetic_disk_raster(size.saturating_mul(2).max(2));
    match preprocess(&raw, None, size) {
        Ok(disk) => disk,
        Err(e) => panic!("synthetic disk failed to preprocess: {e}"),
    }
}

pub fn encode_png_rgba(image: &RgbaImage) -> Vec<u8> {
    match encode_png(image) {
        Ok(bytes) => bytes,
        Err(e) => panic!("failed to encode fixture: {e}"),
    }
}

/// Ephemeris returning the same snapshot for every instant.
pub struct FixedEphemeris(pub SkySnapshot);

impl Ephemeris for FixedEphemeris {
    fn sky_at(&self, _instant: DateTime<Utc>) -> SkySnapshot {
        self.0.clone()
    }
}

/// Single-tile source that fails a scripted number of times, then serves a
/// fixed image. Each fetch can advance a simulated clock to model download
/// time.
pub struct ScriptedSource {
    tile: Vec<u8>,
    failures: AtomicU32,
    calls: AtomicU32,
    fetch_time: Option<(Arc<SimulatedTimeSource>, chrono::Duration)>,
}

impl ScriptedSource {
    pub fn new(tile: Vec<u8>) -> Self {
        Self {
            tile,
            failures: AtomicU32::new(0),
            calls: AtomicU32::new(0),
            fetch_time: None,
        }
    }

    /// Serve `synthetic_disk_raster(size)`.
    pub fn synthetic(size: u32) -> Self {
        Self::new(encode_png_rgba(&synthetic_disk_raster(size)))
    }

    pub fn failing_first(self, failures: u32) -> Self {
        self.failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn with_fetch_time(
        mut self,
        clock: Arc<SimulatedTimeSource>,
        duration: chrono::Duration,
    ) -> Self {
        self.fetch_time = Some((clock, duration));
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageSource for ScriptedSource {
    fn grid(&self) -> u32 {
        1
    }

    fn fetch_tile(&self, target: &AcquisitionTarget, _tile: Tile) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((clock, duration)) = &self.fetch_time {
            clock.advance(*duration);
        }

        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(FetchError::Timeout {
                resource: target.to_string(),
            });
        }
        Ok(self.tile.clone())
    }
}
