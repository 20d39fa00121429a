//! Fetch command: a single acquisition cycle without the daemon loop.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::acquisition::{AcquisitionScheduler, CycleOutcome};
use crate::common::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::common::logger::Log;
use crate::common::utils::private_path;
use crate::config;
use crate::io::lock::{LockStatus, acquire_lock};
use crate::io::signals::setup_signal_handler;
use crate::time::{RealTimeSource, TimeSource};

/// Handle `earthpaper fetch`.
///
/// Refuses to run while a daemon holds the cache; `kill -USR1` the daemon
/// instead.
pub fn handle_fetch_command(debug_enabled: bool) -> Result<i32> {
    Log::set_debug(debug_enabled);
    log_version!();
    if debug_enabled {
        log_pipe!();
        log_debug!("Debug mode enabled, showing per-attempt details");
    }

    let config = config::load()?;
    let data_dir = config.data_dir()?;
    let _lock = match acquire_lock(&data_dir)? {
        LockStatus::Acquired(guard) => guard,
        LockStatus::Held { pid } => {
            let holder = pid.map(|p| format!(" (PID {p})")).unwrap_or_default();
            log_error_exit!(
                "A daemon{holder} is using {}; send it SIGUSR1 to refresh",
                private_path(&data_dir)
            );
            return Ok(EXIT_FAILURE);
        }
    };

    let signal_state = setup_signal_handler()?;
    let clock: Arc<dyn TimeSource> = Arc::new(RealTimeSource);
    let scheduler = AcquisitionScheduler::from_config(&config, clock)
        .context("Failed to set up the acquisition scheduler")?
        .with_running_flag(signal_state.running.clone());

    let code = exit_code(&scheduler.run_cycle());
    log_end!();
    Ok(code)
}

/// Success when the target bucket ends up fresh.
pub fn exit_code(outcome: &CycleOutcome) -> i32 {
    match outcome {
        CycleOutcome::UpToDate(_) | CycleOutcome::Published { .. } => EXIT_SUCCESS,
        CycleOutcome::Failed { .. } | CycleOutcome::Skipped => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::AcquisitionTarget;
    use crate::error::AcquisitionError;
    use crate::time::parse_utc_datetime;

    #[test]
    fn test_exit_codes() {
        let target =
            AcquisitionTarget::for_instant(parse_utc_datetime("2026-05-04 12:00").unwrap());
        assert_eq!(exit_code(&CycleOutcome::UpToDate(target)), EXIT_SUCCESS);
        assert_eq!(
            exit_code(&CycleOutcome::Published {
                target,
                attempts: 2
            }),
            EXIT_SUCCESS
        );
        assert_eq!(
            exit_code(&CycleOutcome::Failed {
                target,
                error: AcquisitionError::Cancelled
            }),
            EXIT_FAILURE
        );
        assert_eq!(exit_code(&CycleOutcome::Skipped), EXIT_FAILURE);
    }
}
