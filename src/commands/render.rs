//! Render command: one wallpaper from the cache.
//!
//! Parameters fall back to the `[Wallpaper defaults]` of the configuration,
//! the timezone to the local one. Invalid parameters exit with 1, a missing
//! image with 2.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Offset, Utc};
use std::path::Path;

use crate::args::RenderArgs;
use crate::common::constants::{EXIT_FAILURE, EXIT_NOT_AVAILABLE, EXIT_SUCCESS};
use crate::common::logger::Log;
use crate::common::utils::{format_bytes, private_path};
use crate::config::{self, Config};
use crate::error::RequestValidationError;
use crate::request::{RequestParams, WallpaperRequest, named_timezone_offset, resolution_preset};
use crate::service::{RenderOutcome, WallpaperService};
use crate::time::parse_utc_datetime;

/// Handle `earthpaper render`.
pub fn handle_render_command(args: &RenderArgs, debug_enabled: bool) -> Result<i32> {
    Log::set_debug(debug_enabled);
    let config = config::load()?;

    let now = match args.at {
        Some(ref at) => parse_utc_datetime(at).map_err(anyhow::Error::msg)?,
        None => Utc::now(),
    };

    let request = match build_params(&config, args, now).and_then(WallpaperRequest::new) {
        Ok(request) => request,
        Err(e) => {
            log_error_exit!("Invalid wallpaper request: {e}");
            return Ok(EXIT_FAILURE);
        }
    };

    let service = WallpaperService::from_config(&config)?;
    match service.render(now, &request)? {
        RenderOutcome::Png(bytes) => {
            let output = Path::new(&args.output);
            std::fs::write(output, &bytes)
                .with_context(|| format!("Failed to write {}", private_path(output)))?;
            log_block_start!(
                "Wrote {}x{} wallpaper to {} ({})",
                request.width(),
                request.height(),
                private_path(output),
                format_bytes(bytes.len() as u64)
            );
            log_end!();
            Ok(EXIT_SUCCESS)
        }
        RenderOutcome::NotAvailable { bucket } => {
            log_error_exit!("no current image (bucket {bucket} is not cached yet)");
            Ok(EXIT_NOT_AVAILABLE)
        }
    }
}

/// Merge command-line values over configured defaults.
///
/// Size precedence, highest first: `--width`/`--height`, `--resolution`, the
/// configured size.
pub fn build_params(
    config: &Config,
    args: &RenderArgs,
    now: DateTime<Utc>,
) -> Result<RequestParams, RequestValidationError> {
    let defaults = RequestParams::from_config(config);
    let (width, height) = match args.resolution.as_deref() {
        Some(name) => resolution_preset(name)?,
        None => (defaults.width, defaults.height),
    };

    let timezone_offset_minutes = match (args.tz_offset, args.timezone.as_deref()) {
        (Some(offset), _) => offset,
        (None, Some(name)) => named_timezone_offset(name, now)?,
        (None, None) => now.with_timezone(&Local).offset().fix().local_minus_utc() / 60,
    };

    Ok(RequestParams {
        width: args.width.unwrap_or(width),
        height: args.height.unwrap_or(height),
        timezone_offset_minutes,
        zoom: args.zoom.unwrap_or(defaults.zoom),
        fov_degrees: args.fov.unwrap_or(defaults.fov_degrees),
        star_intensity: args.stars.unwrap_or(defaults.star_intensity),
        constellation_alpha: args.constellations.unwrap_or(defaults.constellation_alpha),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_override_config() {
        let config = Config {
            width: Some(2560),
            height: Some(1440),
            zoom: Some(0.6),
            ..Config::default()
        };
        let args = RenderArgs {
            output: "out.png".into(),
            height: Some(1600),
            tz_offset: Some(-300),
            ..RenderArgs::default()
        };
        let now = parse_utc_datetime("2026-05-04 12:00").unwrap();
        let params = build_params(&config, &args, now).unwrap();
        assert_eq!(params.width, 2560);
        assert_eq!(params.height, 1600);
        assert_eq!(params.zoom, 0.6);
        assert_eq!(params.timezone_offset_minutes, -300);
    }

    #[test]
    fn test_resolution_preset_sits_between_config_and_dimensions() {
        let config = Config {
            width: Some(2560),
            height: Some(1440),
            ..Config::default()
        };
        let now = parse_utc_datetime("2026-05-04 12:00").unwrap();
        let args = RenderArgs {
            output: "out.png".into(),
            resolution: Some("FHD".into()),
            tz_offset: Some(0),
            ..RenderArgs::default()
        };
        let params = build_params(&config, &args, now).unwrap();
        assert_eq!((params.width, params.height), (1366, 768));

        let explicit = RenderArgs {
            width: Some(1400),
            ..args.clone()
        };
        let params = build_params(&config, &explicit, now).unwrap();
        assert_eq!((params.width, params.height), (1400, 768));

        let unknown = RenderArgs {
            resolution: Some("VGA".into()),
            ..args
        };
        assert_eq!(
            build_params(&config, &unknown, now),
            Err(RequestValidationError::UnknownResolution("VGA".into()))
        );
    }

    #[test]
    fn test_named_timezone_is_resolved_at_render_time() {
        let args = RenderArgs {
            output: "out.png".into(),
            timezone: Some("America/New_York".into()),
            ..RenderArgs::default()
        };
        let summer = parse_utc_datetime("2026-07-01 12:00").unwrap();
        let params = build_params(&Config::default(), &args, summer).unwrap();
        assert_eq!(params.timezone_offset_minutes, -240);

        let unknown = RenderArgs {
            timezone: Some("Nowhere/Special".into()),
            ..args
        };
        assert!(matches!(
            build_params(&Config::default(), &unknown, summer),
            Err(RequestValidationError::UnknownTimezone(_))
        ));
    }
}
