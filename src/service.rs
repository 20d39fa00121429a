//! Request-side entry point: render wallpapers from the cache and report its
//! state.
//!
//! Rendering never fetches. A request either finds a fresh canonical disk for
//! its display instant and gets PNG bytes, or learns that none is available
//! yet. Acquisition errors are invisible from here.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::cache::{AcquisitionTarget, FreshnessCache, FsStore, TimeBucket};
use crate::config::Config;
use crate::error::RenderError;
use crate::imaging::{compose, encode_png};
use crate::request::{WallpaperRequest, timezone_offset_minutes};
use crate::sky::{Ephemeris, GeostationaryEphemeris, ProjectionParams, StarCatalog, project};

/// Rendering parameters that come from configuration rather than the request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceSettings {
    pub publication_delay: chrono::Duration,
    pub satellite_timezone: chrono_tz::Tz,
    pub star_radius_scale: f64,
    pub star_blur: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Png(Vec<u8>),
    /// No fresh image for the bucket the request maps to.
    NotAvailable { bucket: TimeBucket },
}

/// Health report for the newest acquirable bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub bucket: TimeBucket,
    pub target: AcquisitionTarget,
    pub fresh: bool,
    /// Modification time of the stored entry, if any.
    pub modified: Option<DateTime<Utc>>,
}

pub struct WallpaperService {
    cache: FreshnessCache,
    ephemeris: Arc<dyn Ephemeris>,
    settings: ServiceSettings,
}

impl WallpaperService {
    pub fn new(
        cache: FreshnessCache,
        ephemeris: Arc<dyn Ephemeris>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            cache,
            ephemeris,
            settings,
        }
    }

    /// Filesystem cache, configured catalog and geostationary ephemeris.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = FreshnessCache::new(Arc::new(FsStore::new(config.data_dir()?)));
        let catalog = StarCatalog::load_or_builtin(config.catalog.as_deref())?;
        let ephemeris = GeostationaryEphemeris::new(
            &catalog,
            config.satellite_longitude(),
            config.limiting_magnitude(),
        );
        let settings = ServiceSettings {
            publication_delay: config.publication_delay(),
            satellite_timezone: config.satellite_timezone()?,
            star_radius_scale: config.star_radius_scale(),
            star_blur: config.star_blur(),
        };
        Ok(Self::new(cache, Arc::new(ephemeris), settings))
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// The instant `request` shows when rendered at `now`.
    pub fn display_instant(&self, now: DateTime<Utc>, request: &WallpaperRequest) -> DateTime<Utc> {
        let satellite_offset = timezone_offset_minutes(&self.settings.satellite_timezone, now);
        request.display_instant(now, satellite_offset, self.settings.publication_delay)
    }

    /// Render `request` as seen at `now`.
    pub fn render(
        &self,
        now: DateTime<Utc>,
        request: &WallpaperRequest,
    ) -> Result<RenderOutcome, RenderError> {
        let instant = self.display_instant(now, request);
        let Some(disk) = self.cache.lookup(instant) else {
            return Ok(RenderOutcome::NotAvailable {
                bucket: TimeBucket::from_instant(instant),
            });
        };

        let sky = self.ephemeris.sky_at(instant);
        let projection = project(
            &sky,
            &ProjectionParams {
                width: request.width(),
                height: request.height(),
                fov_degrees: request.fov_degrees(),
                star_intensity: request.star_intensity(),
                radius_scale: self.settings.star_radius_scale,
            },
        );
        log_debug!(
            "Rendering {} with {} star(s) and {} edge(s)",
            TimeBucket::from_instant(instant),
            projection.stars.len(),
            projection.edges.len()
        );

        let wallpaper = compose(&disk, request, &projection, self.settings.star_blur);
        Ok(RenderOutcome::Png(encode_png(&wallpaper)?))
    }

    /// State of the bucket the scheduler currently targets.
    pub fn cache_status(&self, now: DateTime<Utc>) -> CacheStatus {
        let target = AcquisitionTarget::for_instant(now - self.settings.publication_delay);
        let entry = self.cache.entry(target.instant);
        CacheStatus {
            bucket: target.bucket,
            target,
            fresh: entry.as_ref().is_some_and(|e| e.is_fresh()),
            modified: entry.map(|e| e.modified),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestParams;
    use crate::sky::SkySnapshot;
    use crate::testing::{FixedEphemeris, synthetic_canonical_disk};
    use crate::time::parse_utc_datetime;
    use nalgebra::Vector3;
    use tempfile::tempdir;

    fn service(dir: &std::path::Path) -> WallpaperService {
        service_in(dir, chrono_tz::Asia::Tokyo)
    }

    fn service_in(dir: &std::path::Path, satellite_timezone: chrono_tz::Tz) -> WallpaperService {
        let sky = SkySnapshot {
            satellite_direction: Vector3::new(1.0, 0.0, 0.0),
            stars: vec![],
            constellation_edges: vec![],
            limiting_magnitude: 7.0,
        };
        WallpaperService::new(
            FreshnessCache::new(Arc::new(FsStore::new(dir))),
            Arc::new(FixedEphemeris(sky)),
            ServiceSettings {
                publication_delay: chrono::Duration::minutes(20),
                satellite_timezone,
                star_radius_scale: 0.0005,
                star_blur: 0.0,
            },
        )
    }

    fn tokyo_request() -> WallpaperRequest {
        WallpaperRequest::new(RequestParams {
            timezone_offset_minutes: 540,
            ..RequestParams::default()
        })
        .unwrap()
    }

    #[test]
    fn test_miss_reports_bucket() {
        let dir = tempdir().unwrap();
        let now = parse_utc_datetime("2026-05-04 14:45").unwrap();
        let outcome = service(dir.path()).render(now, &tokyo_request()).unwrap();
        assert_eq!(
            outcome,
            RenderOutcome::NotAvailable {
                bucket: TimeBucket::new(14, 20).unwrap()
            }
        );
    }

    #[test]
    fn test_hit_renders_png_of_requested_size() {
        let dir = tempdir().unwrap();
        let service = service(dir.path());
        let now = parse_utc_datetime("2026-05-04 14:45").unwrap();
        let target =
            AcquisitionTarget::for_instant(parse_utc_datetime("2026-05-04 14:25").unwrap());
        service
            .cache
            .publish(&target, &synthetic_canonical_disk(64))
            .unwrap();

        let RenderOutcome::Png(bytes) = service.render(now, &tokyo_request()).unwrap() else {
            panic!("expected an image");
        };
        let image = image::load_from_memory(&bytes).unwrap();
        assert_eq!((image.width(), image.height()), (1920, 1080));
    }

    #[test]
    fn test_day_apart_offsets_render_the_newest_image() {
        let dir = tempdir().unwrap();
        // Auckland is +12:00 in July, the requester is at UTC-12:00
        let service = service_in(dir.path(), chrono_tz::Pacific::Auckland);
        let now = parse_utc_datetime("2026-07-04 12:00").unwrap();
        let request = WallpaperRequest::new(RequestParams {
            timezone_offset_minutes: -720,
            ..RequestParams::default()
        })
        .unwrap();

        let newest = parse_utc_datetime("2026-07-04 11:40").unwrap();
        assert_eq!(service.display_instant(now, &request), newest);

        service
            .cache
            .publish(
                &AcquisitionTarget::for_instant(newest),
                &synthetic_canonical_disk(32),
            )
            .unwrap();
        assert!(matches!(
            service.render(now, &request).unwrap(),
            RenderOutcome::Png(_)
        ));
    }

    #[test]
    fn test_cache_status_tracks_freshness() {
        let dir = tempdir().unwrap();
        let service = service(dir.path());
        let now = parse_utc_datetime("2026-05-04 14:45").unwrap();

        let empty = service.cache_status(now);
        assert_eq!(empty.bucket, TimeBucket::new(14, 20).unwrap());
        assert!(!empty.fresh);
        assert_eq!(empty.modified, None);

        service
            .cache
            .publish(&empty.target, &synthetic_canonical_disk(32))
            .unwrap();
        let filled = service.cache_status(now);
        assert!(filled.fresh);
        assert_eq!(filled.modified, Some(empty.target.instant));
    }
}
