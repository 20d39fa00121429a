//! One acquisition cycle.
//!
//! ```text
//! ComputeTarget → CheckCache ─fresh→ Done
//!                      └─stale→ Fetch ⇄ Validate (bounded retry) → Preprocess → Publish → Done
//! ```
//!
//! A cycle never runs twice at once: a second caller while one is in flight
//! gets [`CycleOutcome::Skipped`]. Failed attempts are not carried over, the
//! next cycle starts from scratch with whatever bucket is then current.

use anyhow::{Context, Result};
use image::RgbaImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::retry::{BackoffStrategy, FixedBackoff, retry_bounded};
use super::source::{ImageSource, TemplateSource, fetch_raster};
use crate::cache::{AcquisitionTarget, FreshnessCache, FsStore};
use crate::common::constants::*;
use crate::config::Config;
use crate::error::AcquisitionError;
use crate::imaging::{load_night_background, preprocess};
use crate::time::TimeSource;

/// Scheduler parameters that do not come with a collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerSettings {
    pub canonical_size: u32,
    pub publication_delay: chrono::Duration,
    pub max_parallel_fetches: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            canonical_size: DEFAULT_CANONICAL_SIZE,
            publication_delay: chrono::Duration::minutes(DEFAULT_PUBLICATION_DELAY as i64),
            max_parallel_fetches: DEFAULT_MAX_PARALLEL_FETCHES,
        }
    }
}

/// How a cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A fresh entry already existed.
    UpToDate(AcquisitionTarget),
    Published {
        target: AcquisitionTarget,
        attempts: u32,
    },
    Failed {
        target: AcquisitionTarget,
        error: AcquisitionError,
    },
    /// Another cycle was in flight.
    Skipped,
}

pub struct AcquisitionScheduler {
    source: Arc<dyn ImageSource>,
    cache: FreshnessCache,
    backoff: Box<dyn BackoffStrategy>,
    clock: Arc<dyn TimeSource>,
    night: Option<RgbaImage>,
    settings: SchedulerSettings,
    pool: rayon::ThreadPool,
    in_flight: AtomicBool,
    running: Arc<AtomicBool>,
}

/// Clears the in-flight flag when a cycle ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl AcquisitionScheduler {
    pub fn new(
        source: Arc<dyn ImageSource>,
        cache: FreshnessCache,
        clock: Arc<dyn TimeSource>,
        settings: SchedulerSettings,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.max_parallel_fetches.max(1))
            .thread_name(|i| format!("{APP_NAME}-fetch-{i}"))
            .build()
            .context("Failed to create fetch thread pool")?;

        Ok(Self {
            source,
            cache,
            backoff: Box::new(FixedBackoff::new(
                DEFAULT_MAX_ATTEMPTS,
                std::time::Duration::from_secs(DEFAULT_RETRY_DELAY),
            )),
            clock,
            night: None,
            settings,
            pool,
            in_flight: AtomicBool::new(false),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Build the production scheduler: template source, filesystem cache,
    /// fixed backoff and the configured night background.
    pub fn from_config(config: &Config, clock: Arc<dyn TimeSource>) -> Result<Self> {
        let source = TemplateSource::new(
            config.source_url(),
            config.tile_grid(),
            config.fetch_timeout(),
        )?;
        let cache = FreshnessCache::new(Arc::new(FsStore::new(config.data_dir()?)));
        let settings = SchedulerSettings {
            canonical_size: config.canonical_size(),
            publication_delay: config.publication_delay(),
            max_parallel_fetches: config.max_parallel_fetches(),
        };

        let night = match config.night_background {
            Some(ref path) => Some(load_night_background(path, settings.canonical_size)?),
            None => None,
        };

        Ok(Self::new(Arc::new(source), cache, clock, settings)?
            .with_backoff(FixedBackoff::new(
                config.max_attempts(),
                config.retry_delay(),
            ))
            .with_night_background(night))
    }

    pub fn with_backoff(mut self, backoff: impl BackoffStrategy + 'static) -> Self {
        self.backoff = Box::new(backoff);
        self
    }

    pub fn with_night_background(mut self, night: Option<RgbaImage>) -> Self {
        self.night = night;
        self
    }

    /// Share the process-wide running flag so shutdown interrupts retry waits.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn cache(&self) -> &FreshnessCache {
        &self.cache
    }

    pub fn clock(&self) -> &Arc<dyn TimeSource> {
        &self.clock
    }

    /// The target a cycle started now would aim for.
    pub fn current_target(&self) -> AcquisitionTarget {
        AcquisitionTarget::for_instant(self.clock.now() - self.settings.publication_delay)
    }

    /// Run one cycle to completion.
    pub fn run_cycle(&self) -> CycleOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log_debug!("Acquisition cycle already in flight, skipping");
            return CycleOutcome::Skipped;
        }
        let _guard = InFlight(&self.in_flight);

        let target = self.current_target();
        if let Some(entry) = self.cache.entry(target.instant)
            && entry.is_fresh()
        {
            log_decorated!("Image for {target} is up to date");
            return CycleOutcome::UpToDate(target);
        }

        log_block_start!("Acquiring image for {target}");
        match self.acquire(&target) {
            Ok(attempts) => {
                log_decorated!(
                    "Published {} after {} attempt(s)",
                    target.bucket,
                    attempts
                );
                CycleOutcome::Published { target, attempts }
            }
            Err(error) => {
                if matches!(error, AcquisitionError::Storage(_)) {
                    log_critical!("Cannot write to the cache for {target}: {error}");
                } else {
                    log_error!("Acquisition for {target} failed: {error}");
                }
                log_indented!("The next cycle will try again");
                CycleOutcome::Failed { target, error }
            }
        }
    }

    fn acquire(&self, target: &AcquisitionTarget) -> Result<u32, AcquisitionError> {
        let (raw, attempts) = retry_bounded(
            self.backoff.as_ref(),
            self.clock.as_ref(),
            &self.running,
            |attempt| {
                log_debug!("Fetch attempt {attempt} for {target}");
                fetch_raster(self.source.as_ref(), target, &self.pool)
            },
        )?;

        log_indented!(
            "Fetched {}x{} raster, preprocessing to {} px",
            raw.width(),
            raw.height(),
            self.settings.canonical_size
        );
        let disk = preprocess(&raw, self.night.as_ref(), self.settings.canonical_size)?;
        drop(raw);

        self.cache.publish(target, &disk)?;
        Ok(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::source::MockImageSource;
    use crate::common::constants::test_constants::*;
    use crate::error::{AttemptError, FetchError};
    use crate::testing::{encode_png_rgba, synthetic_disk_raster};
    use crate::time::{SimulatedTimeSource, parse_utc_datetime};
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;
    use tempfile::tempdir;

    fn settings() -> SchedulerSettings {
        SchedulerSettings {
            canonical_size: TEST_CANONICAL_SIZE,
            publication_delay: chrono::Duration::minutes(20),
            max_parallel_fetches: 2,
        }
    }

    fn clock_at(at: &str) -> Arc<SimulatedTimeSource> {
        Arc::new(SimulatedTimeSource::starting_at(
            parse_utc_datetime(at).unwrap(),
            chrono::Duration::hours(6),
        ))
    }

    fn flaky_source(failures: u32, calls: Arc<AtomicU32>) -> MockImageSource {
        let tile = encode_png_rgba(&synthetic_disk_raster(TEST_SOURCE_SIZE));
        let mut source = MockImageSource::new();
        source.expect_grid().return_const(1u32);
        source.expect_fetch_tile().returning(move |_, _| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < failures + 1 {
                Err(FetchError::Timeout {
                    resource: "disk".into(),
                })
            } else {
                Ok(tile.clone())
            }
        });
        source
    }

    fn scheduler(source: MockImageSource, dir: &std::path::Path, at: &str) -> AcquisitionScheduler {
        let cache = FreshnessCache::new(Arc::new(FsStore::new(dir)));
        AcquisitionScheduler::new(Arc::new(source), cache, clock_at(at), settings())
            .unwrap()
            .with_backoff(FixedBackoff::new(5, Duration::from_secs(30)))
    }

    #[test]
    fn test_target_subtracts_publication_delay() {
        let dir = tempdir().unwrap();
        let s = scheduler(MockImageSource::new(), dir.path(), "2026-05-04 14:45");
        let target = s.current_target();
        assert_eq!(target.bucket.to_string(), "14:20");
        assert_eq!(target.instant, parse_utc_datetime("2026-05-04 14:20").unwrap());
    }

    #[test]
    fn test_retries_then_publishes_once() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let s = scheduler(flaky_source(2, calls.clone()), dir.path(), "2026-05-04 14:45");

        match s.run_cycle() {
            CycleOutcome::Published { attempts, target } => {
                assert_eq!(attempts, 3);
                assert!(s.cache().lookup(target.instant).is_some());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // The fresh entry short-circuits the next cycle in the same bucket
        assert!(matches!(s.run_cycle(), CycleOutcome::UpToDate(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_exhaustion_leaves_cache_untouched() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let s = scheduler(flaky_source(100, calls.clone()), dir.path(), "2026-05-04 14:45");

        match s.run_cycle() {
            CycleOutcome::Failed { error, target } => {
                assert!(matches!(
                    error,
                    AcquisitionError::AttemptsExhausted {
                        attempts: 5,
                        last: AttemptError::Fetch(_)
                    }
                ));
                assert!(s.cache().entry(target.instant).is_none());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_unwritable_cache_fails_the_cycle() {
        let dir = tempdir().unwrap();
        // A regular file where the cache root directory should be
        let root = dir.path().join("cache");
        std::fs::write(&root, b"").unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let s = scheduler(flaky_source(0, calls.clone()), &root, "2026-05-04 14:45");

        match s.run_cycle() {
            CycleOutcome::Failed { error, .. } => {
                assert!(matches!(error, AcquisitionError::Storage(_)));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        // Storage failures are not retried within the cycle
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stale_entry_is_refetched() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(AtomicU32::new(0));

        // Yesterday's 14:20
        let yesterday = scheduler(flaky_source(0, calls.clone()), dir.path(), "2026-05-03 14:45");
        assert!(matches!(yesterday.run_cycle(), CycleOutcome::Published { .. }));

        let today = scheduler(flaky_source(0, calls.clone()), dir.path(), "2026-05-04 14:45");
        assert!(matches!(today.run_cycle(), CycleOutcome::Published { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_cycle_is_skipped() {
        let dir = tempdir().unwrap();
        let s = scheduler(MockImageSource::new(), dir.path(), "2026-05-04 14:45");
        s.in_flight.store(true, Ordering::SeqCst);
        assert!(matches!(s.run_cycle(), CycleOutcome::Skipped));
    }
}
