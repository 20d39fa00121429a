//! Default configuration file generation.
//!
//! Writes a commented `earthpaper.toml` whose values come straight from
//! `constants.rs`, with comments aligned to a common column.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::common::constants::*;
use crate::common::utils::private_path;

/// Create the default configuration file at `path`, creating parent directories.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    fs::write(path, default_config_content())
        .with_context(|| format!("Failed to write default config to {}", private_path(path)))?;

    log_block_start!("Created default configuration");
    log_indented!("{}", private_path(path));
    Ok(())
}

/// Render the commented default configuration.
pub fn default_config_content() -> String {
    let mut content = ConfigBuilder::new()
        .add_section("Acquisition")
        .add_commented_setting(
            "data_dir",
            "\"~/.cache/earthpaper\"",
            "Cache root (defaults to $XDG_CACHE_HOME/earthpaper)",
        )
        .add_setting(
            "source_url",
            &format!("\"{DEFAULT_SOURCE_URL}\""),
            "Tile URL or local path template",
        )
        .add_setting(
            "tile_grid",
            &DEFAULT_TILE_GRID.to_string(),
            &format!("Tiles per side ({MINIMUM_TILE_GRID}-{MAXIMUM_TILE_GRID})"),
        )
        .add_setting(
            "canonical_size",
            &DEFAULT_CANONICAL_SIZE.to_string(),
            &format!(
                "Cached disk size in pixels ({MINIMUM_CANONICAL_SIZE}-{MAXIMUM_CANONICAL_SIZE})"
            ),
        )
        .add_setting(
            "publication_delay",
            &DEFAULT_PUBLICATION_DELAY.to_string(),
            &format!(
                "Upstream latency in minutes ({MINIMUM_PUBLICATION_DELAY}-{MAXIMUM_PUBLICATION_DELAY})"
            ),
        )
        .add_commented_setting(
            "night_background",
            "\"~/.config/earthpaper/night.png\"",
            "Night lights layer (see 'earthpaper prepare-night')",
        )
        .add_section("Schedule")
        .add_setting(
            "interval",
            &DEFAULT_INTERVAL.to_string(),
            &format!("Minutes between cycles, divides 60 ({MINIMUM_INTERVAL}-{MAXIMUM_INTERVAL})"),
        )
        .add_setting(
            "phase",
            &DEFAULT_PHASE.to_string(),
            "Minutes past each interval boundary",
        )
        .add_setting(
            "overlap",
            &format!("\"{}\"", DEFAULT_OVERLAP.as_str()),
            "Overrunning cycle: \"skip\" or \"queue\"",
        )
        .add_section("Retry")
        .add_setting(
            "max_attempts",
            &DEFAULT_MAX_ATTEMPTS.to_string(),
            &format!("Fetch attempts per cycle ({MINIMUM_MAX_ATTEMPTS}-{MAXIMUM_MAX_ATTEMPTS})"),
        )
        .add_setting(
            "retry_delay",
            &DEFAULT_RETRY_DELAY.to_string(),
            &format!("Seconds between attempts (0-{MAXIMUM_RETRY_DELAY})"),
        )
        .add_setting(
            "fetch_timeout",
            &DEFAULT_FETCH_TIMEOUT.to_string(),
            &format!("Per-request timeout in seconds ({MINIMUM_FETCH_TIMEOUT}-{MAXIMUM_FETCH_TIMEOUT})"),
        )
        .add_setting(
            "max_parallel_fetches",
            &DEFAULT_MAX_PARALLEL_FETCHES.to_string(),
            &format!(
                "Concurrent tile downloads ({MINIMUM_MAX_PARALLEL_FETCHES}-{MAXIMUM_MAX_PARALLEL_FETCHES})"
            ),
        )
        .add_section("Sky")
        .add_commented_setting(
            "catalog",
            "\"~/.config/earthpaper/stars.json\"",
            "Custom star catalog (built-in bright stars otherwise)",
        )
        .add_setting(
            "limiting_magnitude",
            &format!("{DEFAULT_LIMITING_MAGNITUDE:.1}"),
            "Faintest star drawn",
        )
        .add_setting(
            "satellite_longitude",
            &DEFAULT_SATELLITE_LONGITUDE.to_string(),
            "Sub-satellite longitude in degrees east",
        )
        .add_setting(
            "satellite_timezone",
            &format!("\"{DEFAULT_SATELLITE_TIMEZONE}\""),
            "Satellite reference timezone (IANA name)",
        )
        .add_setting(
            "star_radius_scale",
            &DEFAULT_STAR_RADIUS_SCALE.to_string(),
            "Star radius as a fraction of the longer side",
        )
        .add_setting(
            "star_blur",
            &DEFAULT_STAR_BLUR.to_string(),
            "Star antialiasing blur sigma (0 = off)",
        )
        .add_section("Wallpaper defaults")
        .add_setting("width", &DEFAULT_WIDTH.to_string(), "Output width in pixels")
        .add_setting("height", &DEFAULT_HEIGHT.to_string(), "Output height in pixels")
        .add_setting(
            "zoom",
            &DEFAULT_ZOOM.to_string(),
            "Disk diameter relative to the shorter side (0-1)",
        )
        .add_setting(
            "fov",
            &format!("{DEFAULT_FOV:.1}"),
            &format!("Field of view in degrees ({MINIMUM_FOV}-{MAXIMUM_FOV})"),
        )
        .add_setting(
            "stars",
            &DEFAULT_STAR_INTENSITY.to_string(),
            "Star intensity (0-1)",
        )
        .add_setting(
            "constellations",
            &DEFAULT_CONSTELLATION_ALPHA.to_string(),
            "Constellation line opacity (0-1)",
        )
        .build();
    content.push('\n');
    content
}

/// Builder for configuration files with aligned trailing comments.
struct ConfigBuilder {
    entries: Vec<Entry>,
}

enum Entry {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(Entry::Section(format!("#[{title}]")));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(Entry::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    /// A setting that is documented but disabled.
    fn add_commented_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(Entry::Setting {
            line: format!("# {key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Setting { line, .. } => Some(line.chars().count()),
                Entry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        for (index, entry) in self.entries.into_iter().enumerate() {
            match entry {
                Entry::Section(title) => {
                    if index > 0 {
                        result.push(String::new());
                    }
                    result.push(title);
                }
                Entry::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.chars().count());
                    result.push(format!("{line}{padding}{comment}"));
                }
            }
        }

        result.join("\n")
    }
}
