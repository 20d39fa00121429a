use chrono::{DateTime, Duration as ChronoDuration, Utc};
use nalgebra::Vector3;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{TempDir, tempdir};

use earthpaper::acquisition::{
    AcquisitionScheduler, CycleOutcome, Daemon, DaemonStats, FixedBackoff, SchedulerSettings,
    TriggerSchedule,
};
use earthpaper::cache::{AcquisitionTarget, FreshnessCache, FsStore, TimeBucket};
use earthpaper::config::OverlapPolicy;
use earthpaper::io::signals::SignalState;
use earthpaper::request::{RequestParams, WallpaperRequest};
use earthpaper::service::{RenderOutcome, ServiceSettings, WallpaperService};
use earthpaper::sky::{ProjectionParams, SkySnapshot, SkyStar, project};
use earthpaper::testing::{FixedEphemeris, ScriptedSource, synthetic_canonical_disk};
use earthpaper::time::{SimulatedTimeSource, TimeSource, parse_utc_datetime};

const CANONICAL_SIZE: u32 = 64;
const SOURCE_SIZE: u32 = 300;

fn at(s: &str) -> DateTime<Utc> {
    parse_utc_datetime(s).unwrap()
}

fn cache_in(dir: &TempDir) -> FreshnessCache {
    FreshnessCache::new(Arc::new(FsStore::new(dir.path())))
}

fn settings(canonical_size: u32) -> SchedulerSettings {
    SchedulerSettings {
        canonical_size,
        publication_delay: ChronoDuration::zero(),
        max_parallel_fetches: 2,
    }
}

fn scheduler(
    source: Arc<ScriptedSource>,
    cache: FreshnessCache,
    clock: Arc<SimulatedTimeSource>,
    canonical_size: u32,
) -> AcquisitionScheduler {
    let clock: Arc<dyn TimeSource> = clock;
    AcquisitionScheduler::new(source, cache, clock, settings(canonical_size))
        .unwrap()
        .with_backoff(FixedBackoff::new(5, Duration::from_secs(30)))
}

/// Run the daemon over `[start, end)` with triggers every 10 minutes at :05.
fn run_daemon(start: &str, end: &str, fetch_minutes: i64, overlap: OverlapPolicy) -> DaemonStats {
    let dir = tempdir().unwrap();
    let clock = Arc::new(SimulatedTimeSource::new(at(start), at(end)));
    let source = ScriptedSource::synthetic(SOURCE_SIZE)
        .with_fetch_time(clock.clone(), ChronoDuration::minutes(fetch_minutes));
    let scheduler = scheduler(Arc::new(source), cache_in(&dir), clock, CANONICAL_SIZE);

    Daemon::new(
        scheduler,
        TriggerSchedule::new(10, 5),
        overlap,
        SignalState::detached(),
    )
    .run()
}

#[test]
fn test_daemon_runs_startup_cycle_then_every_trigger() {
    let stats = run_daemon("2026-05-04 00:00:30", "2026-05-04 01:00", 0, OverlapPolicy::Skip);

    // Startup plus :05, :15, :25, :35, :45, :55
    assert_eq!(stats.cycles, 7);
    // The :05 trigger finds the 00:00 bucket just published
    assert_eq!(stats.up_to_date, 1);
    assert_eq!(stats.published, 6);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.missed_triggers, 0);
}

#[test]
fn test_slow_fetches_skip_overrun_triggers() {
    let stats = run_daemon("2026-05-04 00:00:30", "2026-05-04 01:30", 15, OverlapPolicy::Skip);
    assert_eq!(stats.cycles, 5);
    assert_eq!(stats.published, 5);
    assert!(stats.missed_triggers > 0);
}

#[test]
fn test_slow_fetches_queue_one_catch_up() {
    let skip = run_daemon("2026-05-04 00:00:30", "2026-05-04 01:30", 15, OverlapPolicy::Skip);
    let queue = run_daemon("2026-05-04 00:00:30", "2026-05-04 01:30", 15, OverlapPolicy::Queue);
    assert_eq!(queue.cycles, 6);
    assert!(queue.cycles > skip.cycles);
    assert!(queue.missed_triggers < skip.missed_triggers);
}

#[test]
fn test_shutdown_before_start_still_runs_startup_cycle() {
    let dir = tempdir().unwrap();
    let clock = Arc::new(SimulatedTimeSource::new(
        at("2026-05-04 12:00"),
        at("2026-05-04 18:00"),
    ));
    let source = Arc::new(ScriptedSource::synthetic(SOURCE_SIZE));
    let scheduler = scheduler(source.clone(), cache_in(&dir), clock, CANONICAL_SIZE);

    let signals = SignalState::detached();
    signals
        .running
        .store(false, std::sync::atomic::Ordering::SeqCst);

    let stats = Daemon::new(
        scheduler,
        TriggerSchedule::new(10, 5),
        OverlapPolicy::Skip,
        signals,
    )
    .run();
    assert_eq!(stats.cycles, 1);
    assert_eq!(source.calls(), 1);
}

#[test]
fn test_retries_then_publishes_exactly_once() {
    let dir = tempdir().unwrap();
    let clock = Arc::new(SimulatedTimeSource::new(
        at("2026-05-04 14:23"),
        at("2026-05-04 18:00"),
    ));
    let source = Arc::new(ScriptedSource::synthetic(SOURCE_SIZE).failing_first(3));
    let scheduler = scheduler(source.clone(), cache_in(&dir), clock.clone(), CANONICAL_SIZE);

    match scheduler.run_cycle() {
        CycleOutcome::Published { target, attempts } => {
            assert_eq!(attempts, 4);
            assert_eq!(target.bucket, TimeBucket::new(14, 20).unwrap());
        }
        other => panic!("expected a publish, got {other:?}"),
    }
    assert_eq!(source.calls(), 4);
    // Three 30 s waits on the simulated clock
    assert_eq!(clock.now(), at("2026-05-04 14:24:30"));

    // The published entry satisfies the next cycle without fetching
    assert!(matches!(scheduler.run_cycle(), CycleOutcome::UpToDate(_)));
    assert_eq!(source.calls(), 4);
}

#[test]
fn test_exhausted_retries_leave_cache_untouched() {
    let dir = tempdir().unwrap();
    let clock = Arc::new(SimulatedTimeSource::new(
        at("2026-05-04 14:23"),
        at("2026-05-04 18:00"),
    ));
    let source = Arc::new(ScriptedSource::synthetic(SOURCE_SIZE).failing_first(10));
    let cache = cache_in(&dir);
    let scheduler = scheduler(source.clone(), cache.clone(), clock.clone(), CANONICAL_SIZE);

    assert!(matches!(scheduler.run_cycle(), CycleOutcome::Failed { .. }));
    assert_eq!(source.calls(), 5);
    assert!(cache.entry(clock.now()).is_none());
}

#[test]
fn test_large_raster_is_reduced_to_canonical_disk() {
    let dir = tempdir().unwrap();
    let clock = Arc::new(SimulatedTimeSource::new(
        at("2026-05-04 14:23"),
        at("2026-05-04 18:00"),
    ));
    let source = Arc::new(ScriptedSource::synthetic(1100));
    let cache = cache_in(&dir);
    let scheduler = scheduler(source, cache.clone(), clock.clone(), 216);

    assert!(matches!(scheduler.run_cycle(), CycleOutcome::Published { .. }));

    let disk = cache.lookup(clock.now()).expect("fresh entry after publish");
    assert_eq!(disk.size(), 216);
    let image = disk.as_rgba();
    for (x, y) in [(0, 0), (215, 0), (0, 215), (215, 215)] {
        assert_eq!(image.get_pixel(x, y)[3], 0, "corner ({x}, {y}) must be transparent");
    }
    assert_eq!(image.get_pixel(108, 108)[3], 255);
}

#[test]
fn test_entry_from_another_day_is_not_served() {
    let dir = tempdir().unwrap();
    let cache = cache_in(&dir);
    let yesterday = AcquisitionTarget::for_instant(at("2026-05-03 14:23"));
    cache
        .publish(&yesterday, &synthetic_canonical_disk(CANONICAL_SIZE))
        .unwrap();

    let today = at("2026-05-04 14:25");
    assert!(cache.store().metadata(TimeBucket::from_instant(today)).unwrap().is_some());
    let entry = cache.entry(today).unwrap();
    assert!(!entry.is_fresh());
    assert!(cache.lookup(today).is_none());
    assert!(cache.lookup(at("2026-05-03 14:25")).is_some());
}

#[test]
fn test_service_renders_from_daemon_cache() {
    let dir = tempdir().unwrap();
    let clock = Arc::new(SimulatedTimeSource::new(
        at("2026-05-04 14:23"),
        at("2026-05-04 18:00"),
    ));
    let cache = cache_in(&dir);
    let scheduler = scheduler(
        Arc::new(ScriptedSource::synthetic(SOURCE_SIZE)),
        cache.clone(),
        clock.clone(),
        CANONICAL_SIZE,
    );
    assert!(matches!(scheduler.run_cycle(), CycleOutcome::Published { .. }));

    let snapshot = SkySnapshot {
        satellite_direction: Vector3::new(1.0, 0.0, 0.0),
        stars: Vec::new(),
        constellation_edges: Vec::new(),
        limiting_magnitude: 6.0,
    };
    let service = WallpaperService::new(
        cache,
        Arc::new(FixedEphemeris(snapshot)),
        ServiceSettings {
            publication_delay: ChronoDuration::zero(),
            satellite_timezone: chrono_tz::UTC,
            star_radius_scale: 0.0005,
            star_blur: 0.0,
        },
    );
    let request = WallpaperRequest::new(RequestParams {
        timezone_offset_minutes: 0,
        ..RequestParams::default()
    })
    .unwrap();

    match service.render(clock.now(), &request).unwrap() {
        RenderOutcome::Png(bytes) => {
            let image = image::load_from_memory(&bytes).unwrap();
            assert_eq!((image.width(), image.height()), (1920, 1080));
        }
        RenderOutcome::NotAvailable { bucket } => panic!("bucket {bucket} should be cached"),
    }

    // Two hours later the 16:20 bucket has not been fetched
    let later = at("2026-05-04 16:23");
    assert!(matches!(
        service.render(later, &request).unwrap(),
        RenderOutcome::NotAvailable { .. }
    ));
}

#[test]
fn test_three_star_sky_renders_one_star_and_no_edges() {
    let dir = tempdir().unwrap();
    let clock = Arc::new(SimulatedTimeSource::new(
        at("2026-05-04 14:23"),
        at("2026-05-04 18:00"),
    ));
    let cache = cache_in(&dir);
    let scheduler = scheduler(
        Arc::new(ScriptedSource::synthetic(SOURCE_SIZE)),
        cache.clone(),
        clock.clone(),
        CANONICAL_SIZE,
    );
    assert!(matches!(scheduler.run_cycle(), CycleOutcome::Published { .. }));

    let sky_star = |id, direction: Vector3<f64>, magnitude| SkyStar {
        id,
        direction: direction.normalize(),
        magnitude,
    };
    // Star 10 sits left of the Earth disk at y = 0; 11 is 90° off and 12 behind
    let snapshot = SkySnapshot {
        satellite_direction: Vector3::new(1.0, 0.0, 0.0),
        stars: vec![
            sky_star(10, Vector3::new(0.9, 0.45, 0.0), 1.0),
            sky_star(11, Vector3::new(0.0, 1.0, 0.0), 2.0),
            sky_star(12, Vector3::new(-1.0, 0.0, 0.3), 3.0),
        ],
        constellation_edges: vec![(10, 11), (11, 12)],
        limiting_magnitude: 7.0,
    };
    let request = WallpaperRequest::new(RequestParams {
        width: 1920,
        height: 1080,
        timezone_offset_minutes: 0,
        zoom: 0.7,
        fov_degrees: 70.0,
        star_intensity: 0.5,
        constellation_alpha: 0.05,
    })
    .unwrap();

    let projection = project(
        &snapshot,
        &ProjectionParams {
            width: 1920,
            height: 1080,
            fov_degrees: 70.0,
            star_intensity: 0.5,
            radius_scale: 0.0005,
        },
    );
    assert_eq!(projection.stars.len(), 1);
    assert_eq!(projection.stars[0].id, 10);
    assert!(projection.edges.is_empty());
    let (sx, sy) = (projection.stars[0].x, projection.stars[0].y);
    // Left of the 756 px disk, which spans x in [582, 1338)
    assert!(sx > 200.0 && sx < 300.0, "star at x = {sx}");
    assert!((sy - 540.0).abs() < 1e-6);

    let service = WallpaperService::new(
        cache,
        Arc::new(FixedEphemeris(snapshot)),
        ServiceSettings {
            publication_delay: ChronoDuration::zero(),
            satellite_timezone: chrono_tz::UTC,
            star_radius_scale: 0.0005,
            star_blur: 0.0,
        },
    );
    let bytes = match service.render(clock.now(), &request).unwrap() {
        RenderOutcome::Png(bytes) => bytes,
        RenderOutcome::NotAvailable { bucket } => panic!("bucket {bucket} should be cached"),
    };
    let image = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (1920, 1080));
    assert!(image.pixels().all(|px| px[3] == 255));

    // The one star is lit; nothing else outside the disk is
    let (cx, cy) = (sx.floor() as u32, sy.floor() as u32);
    let near_star = (cx - 2..=cx + 2)
        .flat_map(|x| (cy - 2..=cy + 2).map(move |y| (x, y)))
        .map(|(x, y)| image.get_pixel(x, y)[0])
        .max()
        .unwrap_or(0);
    assert!(near_star > 0, "star pixel is dark");
    for (x, y) in [(100, 100), (1800, 540), (400, 900), (cx + 20, cy)] {
        assert_eq!(image.get_pixel(x, y)[0], 0, "({x}, {y}) should be black");
    }
    // The Earth disk is centred
    assert!(image.get_pixel(960, 540)[0] > 0 || image.get_pixel(960, 540)[1] > 0);
}
