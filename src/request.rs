//! Typed wallpaper requests.
//!
//! Loose caller input is collected in [`RequestParams`] and checked once by
//! [`WallpaperRequest::new`]. Everything downstream takes a validated
//! `WallpaperRequest` and never re-checks ranges.

use chrono::{DateTime, Duration, Offset, TimeZone, Utc};

use crate::common::constants::*;
use crate::config::Config;
use crate::error::RequestValidationError;

/// Unvalidated wallpaper parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestParams {
    pub width: u32,
    pub height: u32,
    pub timezone_offset_minutes: i32,
    pub zoom: f64,
    pub fov_degrees: f64,
    pub star_intensity: f64,
    pub constellation_alpha: f64,
}

impl Default for RequestParams {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            timezone_offset_minutes: 0,
            zoom: DEFAULT_ZOOM,
            fov_degrees: DEFAULT_FOV,
            star_intensity: DEFAULT_STAR_INTENSITY,
            constellation_alpha: DEFAULT_CONSTELLATION_ALPHA,
        }
    }
}

impl RequestParams {
    /// Defaults taken from the `[Wallpaper defaults]` section of the config.
    ///
    /// `width` and `height` override the `resolution` preset. Validation has
    /// already rejected unknown preset names.
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        let (width, height) = config
            .resolution
            .as_deref()
            .and_then(|name| resolution_preset(name).ok())
            .unwrap_or((defaults.width, defaults.height));
        Self {
            width: config.width.unwrap_or(width),
            height: config.height.unwrap_or(height),
            timezone_offset_minutes: defaults.timezone_offset_minutes,
            zoom: config.zoom.unwrap_or(defaults.zoom),
            fov_degrees: config.fov.unwrap_or(defaults.fov_degrees),
            star_intensity: config.stars.unwrap_or(defaults.star_intensity),
            constellation_alpha: config
                .constellations
                .unwrap_or(defaults.constellation_alpha),
        }
    }
}

/// A validated wallpaper request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallpaperRequest {
    width: u32,
    height: u32,
    timezone_offset_minutes: i32,
    zoom: f64,
    fov_degrees: f64,
    star_intensity: f64,
    constellation_alpha: f64,
}

impl WallpaperRequest {
    pub fn new(params: RequestParams) -> Result<Self, RequestValidationError> {
        check_dimension("width", params.width)?;
        check_dimension("height", params.height)?;

        if params.timezone_offset_minutes.abs() > MAXIMUM_TIMEZONE_OFFSET_MINUTES {
            return Err(RequestValidationError::TimezoneOffset {
                value: params.timezone_offset_minutes,
                max: MAXIMUM_TIMEZONE_OFFSET_MINUTES,
            });
        }

        check_range("zoom", params.zoom, 0.0, 1.0)?;
        check_range("fov", params.fov_degrees, MINIMUM_FOV, MAXIMUM_FOV)?;
        check_range("stars", params.star_intensity, 0.0, 1.0)?;
        check_range("constellations", params.constellation_alpha, 0.0, 1.0)?;

        Ok(Self {
            width: params.width,
            height: params.height,
            timezone_offset_minutes: params.timezone_offset_minutes,
            zoom: params.zoom,
            fov_degrees: params.fov_degrees,
            star_intensity: params.star_intensity,
            constellation_alpha: params.constellation_alpha,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn timezone_offset_minutes(&self) -> i32 {
        self.timezone_offset_minutes
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn fov_degrees(&self) -> f64 {
        self.fov_degrees
    }

    pub fn star_intensity(&self) -> f64 {
        self.star_intensity
    }

    pub fn constellation_alpha(&self) -> f64 {
        self.constellation_alpha
    }

    /// Side of the Earth disk on the wallpaper.
    pub fn disk_size(&self) -> u32 {
        (self.zoom * self.width.min(self.height) as f64).floor() as u32
    }

    /// The instant whose image this request shows.
    ///
    /// The requester sees the Earth as it looked when the satellite's local
    /// clock read what the requester's clock reads now. The shift is the exact
    /// signed minute difference between the two offsets, taken modulo one day
    /// so the result always falls in `(newest − 24h, newest]` where `newest` is
    /// the last acquirable instant (`now − publication_delay`).
    pub fn display_instant(
        &self,
        now: DateTime<Utc>,
        satellite_offset_minutes: i32,
        publication_delay: Duration,
    ) -> DateTime<Utc> {
        let newest = now - publication_delay;
        let shift = i64::from(satellite_offset_minutes - self.timezone_offset_minutes);
        let shift_minutes = shift.rem_euclid(MINUTES_PER_DAY);
        newest - Duration::minutes(shift_minutes)
    }
}

/// Dimensions of a named resolution preset such as `4K` or `wqhd`.
pub fn resolution_preset(name: &str) -> Result<(u32, u32), RequestValidationError> {
    RESOLUTION_PRESETS
        .iter()
        .find(|(preset, _, _)| preset.eq_ignore_ascii_case(name.trim()))
        .map(|&(_, width, height)| (width, height))
        .ok_or_else(|| RequestValidationError::UnknownResolution(name.to_string()))
}

/// UTC offset of `timezone` at `at`, in signed minutes.
pub fn timezone_offset_minutes<Tz: TimeZone>(timezone: &Tz, at: DateTime<Utc>) -> i32 {
    timezone
        .offset_from_utc_datetime(&at.naive_utc())
        .fix()
        .local_minus_utc()
        / 60
}

/// Offset of an IANA timezone name at `at`.
pub fn named_timezone_offset(name: &str, at: DateTime<Utc>) -> Result<i32, RequestValidationError> {
    let timezone: chrono_tz::Tz = name
        .parse()
        .map_err(|_| RequestValidationError::UnknownTimezone(name.to_string()))?;
    Ok(timezone_offset_minutes(&timezone, at))
}

fn check_dimension(field: &'static str, value: u32) -> Result<(), RequestValidationError> {
    if value <= MINIMUM_DIMENSION_EXCLUSIVE || value > MAXIMUM_DIMENSION {
        return Err(RequestValidationError::Dimension {
            field,
            value,
            min: MINIMUM_DIMENSION_EXCLUSIVE,
            max: MAXIMUM_DIMENSION,
        });
    }
    Ok(())
}

fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), RequestValidationError> {
    // Written so that NaN fails too
    if !(value >= min && value <= max) {
        return Err(RequestValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
