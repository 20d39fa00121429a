//! Bounded retry of fetch attempts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::common::constants::LOOP_POLL_INTERVAL_MS;
use crate::error::{AcquisitionError, AttemptError};
use crate::time::TimeSource;

/// Decides whether and when to try again.
pub trait BackoffStrategy: Send + Sync {
    /// Whether to make another attempt after `attempt` (1-based) failed.
    fn should_retry(&self, attempt: u32, error: &AttemptError) -> bool;

    /// How long to wait after failed attempt `attempt`.
    fn delay_for(&self, attempt: u32) -> Duration;
}

/// At most `max_attempts` attempts, a constant delay apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl FixedBackoff {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl BackoffStrategy for FixedBackoff {
    fn should_retry(&self, attempt: u32, _error: &AttemptError) -> bool {
        attempt < self.max_attempts
    }

    fn delay_for(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Run `attempt` until it succeeds or `backoff` gives up.
///
/// Returns the value and the number of attempts made. Waits go through
/// `clock` and end early when `running` is cleared.
pub fn retry_bounded<T>(
    backoff: &dyn BackoffStrategy,
    clock: &dyn TimeSource,
    running: &AtomicBool,
    mut attempt: impl FnMut(u32) -> Result<T, AttemptError>,
) -> Result<(T, u32), AcquisitionError> {
    let mut number = 1;
    loop {
        match attempt(number) {
            Ok(value) => return Ok((value, number)),
            Err(error) => {
                if !backoff.should_retry(number, &error) {
                    return Err(AcquisitionError::AttemptsExhausted {
                        attempts: number,
                        last: error,
                    });
                }

                let delay = backoff.delay_for(number);
                log_warning!("Attempt {number} failed: {error}");
                log_indented!("Retrying in {}s", delay.as_secs());

                if !interruptible_sleep(clock, delay, running) {
                    return Err(AcquisitionError::Cancelled);
                }
                number += 1;
            }
        }
    }
}

/// Sleep for `duration`, waking early when `running` is cleared.
///
/// Simulated clocks sleep in one step. Returns whether the process is still
/// running afterwards.
pub fn interruptible_sleep(
    clock: &dyn TimeSource,
    duration: Duration,
    running: &AtomicBool,
) -> bool {
    if clock.is_simulated() {
        clock.sleep(duration);
        return running.load(Ordering::SeqCst);
    }

    let poll = Duration::from_millis(LOOP_POLL_INTERVAL_MS);
    let mut remaining = duration;
    while !remaining.is_zero() {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let step = remaining.min(poll);
        clock.sleep(step);
        remaining -= step;
    }
    running.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::time::{SimulatedTimeSource, parse_utc_datetime};
    use chrono::Duration as ChronoDuration;

    fn clock() -> SimulatedTimeSource {
        SimulatedTimeSource::starting_at(
            parse_utc_datetime("2026-05-04 14:00").unwrap(),
            ChronoDuration::hours(2),
        )
    }

    fn timeout() -> AttemptError {
        FetchError::Timeout {
            resource: "disk".into(),
        }
        .into()
    }

    #[test]
    fn test_succeeds_after_failures() {
        let clock = clock();
        let running = AtomicBool::new(true);
        let backoff = FixedBackoff::new(5, Duration::from_secs(30));

        let (value, attempts) = retry_bounded(&backoff, &clock, &running, |n| {
            if n < 3 { Err(timeout()) } else { Ok(n * 10) }
        })
        .unwrap();

        assert_eq!((value, attempts), (30, 3));
        // Two waits of 30 s on the simulated clock
        assert_eq!(
            clock.now(),
            parse_utc_datetime("2026-05-04 14:01").unwrap()
        );
    }

    #[test]
    fn test_exhaustion_reports_last_error() {
        let clock = clock();
        let running = AtomicBool::new(true);
        let backoff = FixedBackoff::new(3, Duration::from_secs(1));
        let mut calls = 0;

        let result: Result<((), u32), _> = retry_bounded(&backoff, &clock, &running, |_| {
            calls += 1;
            Err(timeout())
        });

        assert_eq!(calls, 3);
        assert!(matches!(
            result,
            Err(AcquisitionError::AttemptsExhausted {
                attempts: 3,
                last: AttemptError::Fetch(FetchError::Timeout { .. })
            })
        ));
    }

    #[test]
    fn test_single_attempt_never_sleeps() {
        let clock = clock();
        let start = clock.now();
        let running = AtomicBool::new(true);
        let backoff = FixedBackoff::new(1, Duration::from_secs(60));

        let result: Result<((), u32), _> =
            retry_bounded(&backoff, &clock, &running, |_| Err(timeout()));
        assert!(result.is_err());
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_shutdown_cancels_wait() {
        let clock = clock();
        let running = AtomicBool::new(false);
        let backoff = FixedBackoff::new(5, Duration::from_secs(1));

        let result: Result<((), u32), _> =
            retry_bounded(&backoff, &clock, &running, |_| Err(timeout()));
        assert!(matches!(result, Err(AcquisitionError::Cancelled)));
    }
}
