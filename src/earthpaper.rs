//! Application coordinator for the acquisition daemon.
//!
//! Handles resource acquisition and hands over to the [`Daemon`] loop:
//! - Optional file logging
//! - Configuration loading
//! - Lock file management for single-instance enforcement
//! - Signal handler setup
//!
//! ```no_run
//! use earthpaper::EarthPaper;
//!
//! # fn main() -> anyhow::Result<()> {
//! EarthPaper::new(false).with_log_file(Some("/tmp/earthpaper.log".into())).run()?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::{
    acquisition::{AcquisitionScheduler, Daemon, TriggerSchedule},
    common::logger::Log,
    common::utils::private_path,
    config,
    io::lock::{LockStatus, acquire_lock},
    io::signals::setup_signal_handler,
    time::{RealTimeSource, TimeSource},
};

/// Builder for configuring and running the daemon.
pub struct EarthPaper {
    debug_enabled: bool,
    log_file: Option<String>,
}

impl EarthPaper {
    /// Create a new runner with defaults matching a normal run
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            log_file: None,
        }
    }

    /// Mirror all output to `path` with timestamps
    pub fn with_log_file(mut self, path: Option<String>) -> Self {
        self.log_file = path;
        self
    }

    /// Run until a shutdown signal arrives.
    pub fn run(self) -> Result<()> {
        let _log_guard = match self.log_file {
            Some(ref path) => {
                let guard = Log::start_file_logging(path.clone())
                    .with_context(|| format!("Failed to start logging to {path}"))?;
                Log::set_timestamps(true);
                Some(guard)
            }
            None => None,
        };

        Log::set_debug(self.debug_enabled);
        log_version!();
        if self.debug_enabled {
            log_pipe!();
            log_debug!("Debug mode enabled, showing per-attempt details");
        }

        let config = config::load()?;
        config.log_config();

        let data_dir = config.data_dir()?;
        let _lock = match acquire_lock(&data_dir)? {
            LockStatus::Acquired(guard) => {
                log_block_start!("Lock acquired: {}", private_path(guard.path()));
                guard
            }
            LockStatus::Held { pid } => {
                let holder = pid.map(|p| format!(" (PID {p})")).unwrap_or_default();
                log_error_exit!("Another earthpaper daemon{holder} is using this cache");
                anyhow::bail!("cache directory {} is locked", private_path(&data_dir));
            }
        };

        let signal_state = setup_signal_handler()?;
        let clock: Arc<dyn TimeSource> = Arc::new(RealTimeSource);
        let scheduler = AcquisitionScheduler::from_config(&config, clock)
            .context("Failed to set up the acquisition scheduler")?;
        let schedule = TriggerSchedule::new(config.interval(), config.phase());

        Daemon::new(scheduler, schedule, config.overlap(), signal_state).run();

        log_end!();
        Ok(())
    }
}
