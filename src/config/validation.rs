//! Configuration validation functionality.
//!
//! Rejects values outside the documented ranges and combinations the scheduler
//! cannot honour (an interval that does not divide the hour, a tiled source
//! template without tile placeholders).

use anyhow::Result;

use super::Config;
use crate::common::constants::*;
use crate::common::utils::private_path;
use crate::request::resolution_preset;

/// Validate every field that is present in `config`.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_acquisition(config)?;
    validate_schedule(config)?;
    validate_retry(config)?;
    validate_sky(config)?;
    validate_wallpaper_defaults(config)?;
    Ok(())
}

fn validate_acquisition(config: &Config) -> Result<()> {
    if let Some(grid) = config.tile_grid
        && !(MINIMUM_TILE_GRID..=MAXIMUM_TILE_GRID).contains(&grid)
    {
        anyhow::bail!(
            "tile_grid ({}) must be between {} and {}",
            grid,
            MINIMUM_TILE_GRID,
            MAXIMUM_TILE_GRID
        );
    }

    let template = config.source_url();
    if template.trim().is_empty() {
        anyhow::bail!("source_url cannot be empty");
    }
    if config.tile_grid() > 1 && !(template.contains("{col}") && template.contains("{row}")) {
        anyhow::bail!(
            "source_url must contain {{col}} and {{row}} placeholders when tile_grid is greater than 1"
        );
    }

    if let Some(size) = config.canonical_size
        && !(MINIMUM_CANONICAL_SIZE..=MAXIMUM_CANONICAL_SIZE).contains(&size)
    {
        anyhow::bail!(
            "canonical_size ({}) must be between {} and {} pixels",
            size,
            MINIMUM_CANONICAL_SIZE,
            MAXIMUM_CANONICAL_SIZE
        );
    }

    if let Some(delay) = config.publication_delay
        && !(MINIMUM_PUBLICATION_DELAY..=MAXIMUM_PUBLICATION_DELAY).contains(&delay)
    {
        anyhow::bail!(
            "publication_delay ({}) must be between {} and {} minutes",
            delay,
            MINIMUM_PUBLICATION_DELAY,
            MAXIMUM_PUBLICATION_DELAY
        );
    }

    if let Some(ref night) = config.night_background
        && !night.is_file()
    {
        anyhow::bail!(
            "night_background file not found: {}",
            private_path(night)
        );
    }

    Ok(())
}

fn validate_schedule(config: &Config) -> Result<()> {
    if let Some(interval) = config.interval {
        if !(MINIMUM_INTERVAL..=MAXIMUM_INTERVAL).contains(&interval) {
            anyhow::bail!(
                "interval ({}) must be between {} and {} minutes",
                interval,
                MINIMUM_INTERVAL,
                MAXIMUM_INTERVAL
            );
        }
        if 60 % interval != 0 {
            anyhow::bail!(
                "interval ({}) must divide 60 so cycles stay aligned to the hour",
                interval
            );
        }
    }

    let interval = config.interval();
    if config.phase() >= interval {
        anyhow::bail!(
            "phase ({}) must be smaller than interval ({})",
            config.phase(),
            interval
        );
    }

    Ok(())
}

fn validate_retry(config: &Config) -> Result<()> {
    if let Some(attempts) = config.max_attempts
        && !(MINIMUM_MAX_ATTEMPTS..=MAXIMUM_MAX_ATTEMPTS).contains(&attempts)
    {
        anyhow::bail!(
            "max_attempts ({}) must be between {} and {}",
            attempts,
            MINIMUM_MAX_ATTEMPTS,
            MAXIMUM_MAX_ATTEMPTS
        );
    }

    if let Some(delay) = config.retry_delay
        && delay > MAXIMUM_RETRY_DELAY
    {
        anyhow::bail!(
            "retry_delay ({}) must be at most {} seconds",
            delay,
            MAXIMUM_RETRY_DELAY
        );
    }

    if let Some(timeout) = config.fetch_timeout
        && !(MINIMUM_FETCH_TIMEOUT..=MAXIMUM_FETCH_TIMEOUT).contains(&timeout)
    {
        anyhow::bail!(
            "fetch_timeout ({}) must be between {} and {} seconds",
            timeout,
            MINIMUM_FETCH_TIMEOUT,
            MAXIMUM_FETCH_TIMEOUT
        );
    }

    if let Some(parallel) = config.max_parallel_fetches
        && !(MINIMUM_MAX_PARALLEL_FETCHES..=MAXIMUM_MAX_PARALLEL_FETCHES).contains(&parallel)
    {
        anyhow::bail!(
            "max_parallel_fetches ({}) must be between {} and {}",
            parallel,
            MINIMUM_MAX_PARALLEL_FETCHES,
            MAXIMUM_MAX_PARALLEL_FETCHES
        );
    }

    Ok(())
}

fn validate_sky(config: &Config) -> Result<()> {
    if let Some(ref catalog) = config.catalog
        && !catalog.is_file()
    {
        anyhow::bail!("catalog file not found: {}", private_path(catalog));
    }

    if let Some(magnitude) = config.limiting_magnitude
        && !(MINIMUM_LIMITING_MAGNITUDE..=MAXIMUM_LIMITING_MAGNITUDE).contains(&magnitude)
    {
        anyhow::bail!(
            "limiting_magnitude ({}) must be between {} and {}",
            magnitude,
            MINIMUM_LIMITING_MAGNITUDE,
            MAXIMUM_LIMITING_MAGNITUDE
        );
    }

    if let Some(lon) = config.satellite_longitude
        && !(-180.0..=180.0).contains(&lon)
    {
        anyhow::bail!(
            "satellite_longitude must be between -180 and 180 degrees (got {})",
            lon
        );
    }

    config.satellite_timezone()?;

    if let Some(scale) = config.star_radius_scale
        && !(0.0..=MAXIMUM_STAR_RADIUS_SCALE).contains(&scale)
    {
        anyhow::bail!(
            "star_radius_scale ({}) must be between 0 and {}",
            scale,
            MAXIMUM_STAR_RADIUS_SCALE
        );
    }

    if let Some(blur) = config.star_blur
        && !(0.0..=MAXIMUM_STAR_BLUR).contains(&blur)
    {
        anyhow::bail!(
            "star_blur ({}) must be between 0 and {}",
            blur,
            MAXIMUM_STAR_BLUR
        );
    }

    Ok(())
}

fn validate_wallpaper_defaults(config: &Config) -> Result<()> {
    if let Some(ref name) = config.resolution {
        resolution_preset(name)?;
    }

    for (name, value) in [("width", config.width), ("height", config.height)] {
        if let Some(value) = value
            && !(value > MINIMUM_DIMENSION_EXCLUSIVE && value <= MAXIMUM_DIMENSION)
        {
            anyhow::bail!(
                "{} ({}) must be greater than {} and at most {} pixels",
                name,
                value,
                MINIMUM_DIMENSION_EXCLUSIVE,
                MAXIMUM_DIMENSION
            );
        }
    }

    if let Some(fov) = config.fov
        && !(MINIMUM_FOV..=MAXIMUM_FOV).contains(&fov)
    {
        anyhow::bail!(
            "fov ({}) must be between {} and {} degrees",
            fov,
            MINIMUM_FOV,
            MAXIMUM_FOV
        );
    }

    for (name, value) in [
        ("zoom", config.zoom),
        ("stars", config.stars),
        ("constellations", config.constellations),
    ] {
        if let Some(value) = value
            && !(0.0..=1.0).contains(&value)
        {
            anyhow::bail!("{} ({}) must be between 0 and 1", name, value);
        }
    }

    Ok(())
}
