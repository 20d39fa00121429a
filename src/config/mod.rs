//! Configuration system for earthpaper.
//!
//! Settings live in `earthpaper.toml`, searched in `$XDG_CONFIG_HOME/earthpaper/`
//! unless a custom directory was given with `--config`. Every field is optional;
//! omitted values fall back to the defaults in [`crate::common::constants`].
//!
//! ```toml
//! #[Acquisition]
//! data_dir = "~/.cache/earthpaper" # Where canonical disk images are cached
//! tile_grid = 4                    # Source mosaic is tile_grid x tile_grid tiles (1-20)
//! canonical_size = 2160            # Side of the cached disk image in pixels (256-8192)
//! publication_delay = 20           # Upstream publication latency in minutes (0-180)
//!
//! #[Schedule]
//! interval = 10                    # Minutes between cycles, must divide 60 (1-60)
//! phase = 5                        # Minutes past each interval boundary
//! overlap = "skip"                 # Overrunning cycle: "skip" missed triggers or "queue" one
//!
//! #[Sky]
//! limiting_magnitude = 7.0         # Faintest star drawn (-2-15)
//! satellite_longitude = 140.7      # Sub-satellite longitude in degrees east
//! satellite_timezone = "Asia/Tokyo"
//!
//! #[Wallpaper defaults]
//! resolution = "WQHD"              # 4K, WQHD, WUXGA, HD or FHD; width/height override it
//! ```
//!
//! Validation runs on every load and rejects out-of-range values with a message
//! naming the field, the accepted range and the offending value.

pub mod builder;
pub mod loading;
pub mod validation;


use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::common::constants::*;
use crate::common::utils::private_path;

// Re-export public API
pub use builder::create_default_config;
pub use loading::{get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir};

/// What the daemon does with triggers that fire while a cycle is still running.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Drop every trigger missed while the cycle ran.
    Skip,
    /// Run one coalesced catch-up cycle as soon as the overrunning one ends.
    Queue,
}

impl OverlapPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlapPolicy::Skip => "skip",
            OverlapPolicy::Queue => "queue",
        }
    }
}

/// Settings loaded from `earthpaper.toml`.
///
/// Fields are grouped the same way as the generated default file:
///
/// - **Acquisition**: `data_dir`, `source_url`, `tile_grid`, `canonical_size`,
///   `publication_delay`, `night_background`
/// - **Schedule**: `interval`, `phase`, `overlap`
/// - **Retry**: `max_attempts`, `retry_delay`, `fetch_timeout`, `max_parallel_fetches`
/// - **Sky**: `catalog`, `limiting_magnitude`, `satellite_longitude`,
///   `satellite_timezone`, `star_radius_scale`, `star_blur`
/// - **Wallpaper defaults**: `resolution`, `width`, `height`, `zoom`, `fov`, `stars`,
///   `constellations`
///
/// The accessor methods of the same name resolve a missing field to its default.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    /// URL or local path template with `{year}` `{month}` `{day}` `{hour}`
    /// `{minute}` `{grid}` `{col}` `{row}` placeholders.
    pub source_url: Option<String>,
    pub tile_grid: Option<u32>,
    pub canonical_size: Option<u32>,
    pub publication_delay: Option<u64>, // minutes
    pub night_background: Option<PathBuf>,

    pub interval: Option<u64>, // minutes
    pub phase: Option<u64>,    // minutes
    pub overlap: Option<OverlapPolicy>,

    pub max_attempts: Option<u32>,
    pub retry_delay: Option<u64>,   // seconds
    pub fetch_timeout: Option<u64>, // seconds
    pub max_parallel_fetches: Option<usize>,

    /// JSON star catalog replacing the built-in bright star list.
    pub catalog: Option<PathBuf>,
    pub limiting_magnitude: Option<f64>,
    pub satellite_longitude: Option<f64>,
    pub satellite_timezone: Option<String>,
    pub star_radius_scale: Option<f64>,
    pub star_blur: Option<f32>,

    /// Named size preset, see [`crate::request::resolution_preset`].
    pub resolution: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub zoom: Option<f64>,
    pub fov: Option<f64>,
    pub stars: Option<f64>,
    pub constellations: Option<f64>,
}

impl Config {
    /// Cache root, `$XDG_CACHE_HOME/earthpaper` unless configured.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::cache_dir()
                .context("Could not determine cache directory")?
                .join(APP_NAME)),
        }
    }

    pub fn source_url(&self) -> &str {
        self.source_url.as_deref().unwrap_or(DEFAULT_SOURCE_URL)
    }

    pub fn tile_grid(&self) -> u32 {
        self.tile_grid.unwrap_or(DEFAULT_TILE_GRID)
    }

    pub fn canonical_size(&self) -> u32 {
        self.canonical_size.unwrap_or(DEFAULT_CANONICAL_SIZE)
    }

    pub fn publication_delay(&self) -> chrono::Duration {
        chrono::Duration::minutes(
            self.publication_delay.unwrap_or(DEFAULT_PUBLICATION_DELAY) as i64,
        )
    }

    pub fn interval(&self) -> u64 {
        self.interval.unwrap_or(DEFAULT_INTERVAL)
    }

    pub fn phase(&self) -> u64 {
        self.phase.unwrap_or(DEFAULT_PHASE)
    }

    pub fn overlap(&self) -> OverlapPolicy {
        self.overlap.unwrap_or(DEFAULT_OVERLAP)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT))
    }

    pub fn max_parallel_fetches(&self) -> usize {
        self.max_parallel_fetches.unwrap_or(DEFAULT_MAX_PARALLEL_FETCHES)
    }

    pub fn limiting_magnitude(&self) -> f64 {
        self.limiting_magnitude.unwrap_or(DEFAULT_LIMITING_MAGNITUDE)
    }

    pub fn satellite_longitude(&self) -> f64 {
        self.satellite_longitude.unwrap_or(DEFAULT_SATELLITE_LONGITUDE)
    }

    /// Satellite reference timezone. Validation guarantees the name parses.
    pub fn satellite_timezone(&self) -> Result<chrono_tz::Tz> {
        let name = self
            .satellite_timezone
            .as_deref()
            .unwrap_or(DEFAULT_SATELLITE_TIMEZONE);
        name.parse::<chrono_tz::Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid satellite_timezone '{name}': {e}"))
    }

    pub fn star_radius_scale(&self) -> f64 {
        self.star_radius_scale.unwrap_or(DEFAULT_STAR_RADIUS_SCALE)
    }

    pub fn star_blur(&self) -> f32 {
        self.star_blur.unwrap_or(DEFAULT_STAR_BLUR)
    }

    /// Print the effective settings in the daemon's startup block.
    pub fn log_config(&self) {
        let source = get_config_path()
            .map(|p| private_path(&p))
            .unwrap_or_else(|_| "defaults".to_string());
        log_block_start!("Loaded configuration from {}", source);

        match self.data_dir() {
            Ok(dir) => log_indented!("Cache: {}", private_path(&dir)),
            Err(e) => log_indented!("Cache: unavailable ({e})"),
        }
        log_indented!(
            "Source: {}x{} tiles, {} px canonical disk",
            self.tile_grid(),
            self.tile_grid(),
            self.canonical_size()
        );
        log_indented!(
            "Schedule: every {} min at +{} min, {} min publication delay, overlap {}",
            self.interval(),
            self.phase(),
            self.publication_delay().num_minutes(),
            self.overlap().as_str()
        );
        log_indented!(
            "Retry: {} attempts, {}s apart, {}s timeout, {} parallel fetches",
            self.max_attempts(),
            self.retry_delay().as_secs(),
            self.fetch_timeout().as_secs(),
            self.max_parallel_fetches()
        );
        if let Some(ref night) = self.night_background {
            log_indented!("Night background: {}", private_path(night));
        }
        match self.catalog {
            Some(ref catalog) => log_indented!("Star catalog: {}", private_path(catalog)),
            None => log_indented!("Star catalog: built-in"),
        }
        log_indented!(
            "Satellite: {:.1}°E ({}), stars to magnitude {:.1}",
            self.satellite_longitude(),
            self.satellite_timezone
                .as_deref()
                .unwrap_or(DEFAULT_SATELLITE_TIMEZONE),
            self.limiting_magnitude()
        );
    }
}
