//! Application-wide constants: defaults, validation limits and fixed parameters.
//!
//! Defaults are used whenever a field is omitted from `earthpaper.toml`, and the
//! `MINIMUM_*`/`MAXIMUM_*` pairs are the hard limits enforced by
//! [`crate::config::validation::validate_config`] and by
//! [`crate::request::WallpaperRequest::new`].

use crate::config::OverlapPolicy;

// # Application Identity

pub const APP_NAME: &str = "earthpaper";
pub const CONFIG_FILE_NAME: &str = "earthpaper.toml";
pub const LOCK_FILE_NAME: &str = "earthpaper.lock";

// # Exit Codes

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// Returned by `render` when no fresh image exists for the requested instant.
pub const EXIT_NOT_AVAILABLE: i32 = 2;

// # Cache Layout

/// File name of the canonical disk image inside a bucket directory.
pub const DISK_FILE_NAME: &str = "disk.png";
/// Width of one time bucket in minutes.
pub const BUCKET_MINUTES: u32 = 10;

// # Image Source Defaults

/// NICT Himawari real-time tiles: a `{grid}`×`{grid}` mosaic of 550 px tiles.
pub const DEFAULT_SOURCE_URL: &str = "https://himawari8.nict.go.jp/img/D531106/{grid}d/550/{year}/{month}/{day}/{hour}{minute}00_{col}_{row}.png";
pub const DEFAULT_TILE_GRID: u32 = 4;
pub const MINIMUM_TILE_GRID: u32 = 1;
pub const MAXIMUM_TILE_GRID: u32 = 20;

/// Smallest stitched source raster accepted by validation (pixels per side).
pub const MINIMUM_SOURCE_SIZE: u32 = 256;

// # Canonical Image

pub const DEFAULT_CANONICAL_SIZE: u32 = 2160;
pub const MINIMUM_CANONICAL_SIZE: u32 = 256;
pub const MAXIMUM_CANONICAL_SIZE: u32 = 8192;

/// Day-side alpha gain: `alpha = min(255, LUMINANCE_ALPHA_GAIN * max(R, G, B))`.
pub const LUMINANCE_ALPHA_GAIN: u16 = 10;

// # Scheduling

pub const DEFAULT_PUBLICATION_DELAY: u64 = 20; // minutes
pub const MINIMUM_PUBLICATION_DELAY: u64 = 0;
pub const MAXIMUM_PUBLICATION_DELAY: u64 = 180;

pub const DEFAULT_INTERVAL: u64 = 10; // minutes
pub const MINIMUM_INTERVAL: u64 = 1;
pub const MAXIMUM_INTERVAL: u64 = 60;

pub const DEFAULT_PHASE: u64 = 5; // minutes past each interval boundary

pub const DEFAULT_OVERLAP: OverlapPolicy = OverlapPolicy::Skip;

/// Upper bound for a single wait in the daemon loop so signals stay responsive.
pub const LOOP_POLL_INTERVAL_MS: u64 = 250;

// # Retry

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const MINIMUM_MAX_ATTEMPTS: u32 = 1;
pub const MAXIMUM_MAX_ATTEMPTS: u32 = 100;

pub const DEFAULT_RETRY_DELAY: u64 = 30; // seconds
pub const MAXIMUM_RETRY_DELAY: u64 = 3600;

pub const DEFAULT_FETCH_TIMEOUT: u64 = 30; // seconds
pub const MINIMUM_FETCH_TIMEOUT: u64 = 1;
pub const MAXIMUM_FETCH_TIMEOUT: u64 = 600;

pub const DEFAULT_MAX_PARALLEL_FETCHES: usize = 8;
pub const MINIMUM_MAX_PARALLEL_FETCHES: usize = 1;
pub const MAXIMUM_MAX_PARALLEL_FETCHES: usize = 64;

// # Sky

pub const DEFAULT_LIMITING_MAGNITUDE: f64 = 7.0;
pub const MINIMUM_LIMITING_MAGNITUDE: f64 = -2.0;
pub const MAXIMUM_LIMITING_MAGNITUDE: f64 = 15.0;

/// Himawari-8/9 sub-satellite longitude in degrees east.
pub const DEFAULT_SATELLITE_LONGITUDE: f64 = 140.7;
pub const DEFAULT_SATELLITE_TIMEZONE: &str = "Asia/Tokyo";

/// Largest star radius as a fraction of the longer wallpaper side.
pub const DEFAULT_STAR_RADIUS_SCALE: f64 = 0.0005;
pub const MAXIMUM_STAR_RADIUS_SCALE: f64 = 0.01;

/// Gaussian sigma of the antialiasing pass over the star layer (0 disables it).
pub const DEFAULT_STAR_BLUR: f32 = 0.6;
pub const MAXIMUM_STAR_BLUR: f32 = 5.0;

/// Stars whose projection denominator falls below this are treated as antipodal.
pub const ANTIPODAL_EPSILON: f64 = 1e-9;

// # Wallpaper Request

pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;
/// Exclusive lower bound for wallpaper width and height.
pub const MINIMUM_DIMENSION_EXCLUSIVE: u32 = 512;
pub const MAXIMUM_DIMENSION: u32 = 4096;

pub const DEFAULT_ZOOM: f64 = 0.8;
pub const DEFAULT_FOV: f64 = 70.0;
pub const MINIMUM_FOV: f64 = 30.0;
pub const MAXIMUM_FOV: f64 = 180.0;
pub const DEFAULT_STAR_INTENSITY: f64 = 0.5;
pub const DEFAULT_CONSTELLATION_ALPHA: f64 = 0.05;

/// UTC-14:00 .. UTC+14:00 expressed in minutes.
pub const MAXIMUM_TIMEZONE_OFFSET_MINUTES: i32 = 14 * 60;

pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Named wallpaper sizes accepted by `--resolution` and the `resolution` key.
/// Names match case-insensitively.
pub const RESOLUTION_PRESETS: &[(&str, u32, u32)] = &[
    ("4K", 3840, 2160),
    ("WQHD", 2560, 1440),
    ("WUXGA", 1920, 1200),
    ("HD", 1920, 1080),
    ("FHD", 1366, 768),
];

// # Night Background

/// Exponent of the limb darkening falloff applied by `prepare-night`.
pub const LIMB_DARKENING_EXPONENT: i32 = 10;
pub const LIMB_DARKENING_RADIUS: f64 = 0.99;

// # Test Constants
