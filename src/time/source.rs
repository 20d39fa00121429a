//! Time source abstraction for real and simulated time.
//!
//! The scheduler, the daemon loop and the rendering service never read the
//! system clock directly. They receive an `Arc<dyn TimeSource>`, which lets
//! tests drive whole acquisition days through a fast-forward clock without
//! waiting.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, TimeZone, Utc};
use std::sync::{Mutex, PoisonError};
use std::time::Duration as StdDuration;

/// Trait for abstracting time operations
pub trait TimeSource: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;

    /// Sleep for the specified duration (or simulate it)
    fn sleep(&self, duration: StdDuration);

    /// Check if this is a simulated time source
    fn is_simulated(&self) -> bool;

    /// Check if simulation has ended (always false for real time)
    fn is_ended(&self) -> bool {
        false
    }
}

/// Real-time implementation that uses actual system time
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: StdDuration) {
        std::thread::sleep(duration);
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// Fast-forward clock: `sleep` advances virtual time instantly.
///
/// Time never moves past `end_time`; once it is reached `is_ended` reports true
/// and further sleeps are no-ops.
pub struct SimulatedTimeSource {
    end_time: DateTime<Utc>,
    current: Mutex<DateTime<Utc>>,
}

impl SimulatedTimeSource {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            end_time,
            current: Mutex::new(start_time.min(end_time)),
        }
    }

    /// Clock that starts at `start_time` and runs for `span` of virtual time.
    pub fn starting_at(start_time: DateTime<Utc>, span: ChronoDuration) -> Self {
        Self::new(start_time, start_time + span)
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// Jump forward by `duration` without going through `sleep`.
    pub fn advance(&self, duration: ChronoDuration) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = (*current + duration).min(self.end_time);
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sleep(&self, duration: StdDuration) {
        let step = ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::MAX);
        {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            *current = current
                .checked_add_signed(step)
                .unwrap_or(self.end_time)
                .min(self.end_time);
        }
        // Let worker threads observe the new time
        std::thread::yield_now();
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn is_ended(&self) -> bool {
        self.now() >= self.end_time
    }
}

/// Parse `YYYY-MM-DD HH:MM[:SS]` as a UTC instant.
pub fn parse_utc_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = s.trim();
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M"))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| format!("Invalid datetime '{s}': {e}. Use YYYY-MM-DD HH:MM"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        parse_utc_datetime(s).unwrap()
    }

    #[test]
    fn test_simulated_sleep_advances_time() {
        let clock = SimulatedTimeSource::new(at("2026-03-01 00:00"), at("2026-03-01 01:00"));
        clock.sleep(StdDuration::from_secs(600));
        assert_eq!(clock.now(), at("2026-03-01 00:10"));
        assert!(!clock.is_ended());
        assert!(clock.is_simulated());
    }

    #[test]
    fn test_simulated_time_caps_at_end() {
        let clock =
            SimulatedTimeSource::starting_at(at("2026-03-01 23:50"), ChronoDuration::minutes(20));
        clock.sleep(StdDuration::from_secs(3 * 3600));
        assert_eq!(clock.now(), at("2026-03-02 00:10"));
        assert!(clock.is_ended());

        clock.advance(ChronoDuration::minutes(5));
        assert_eq!(clock.now(), clock.end_time());
    }

    #[test]
    fn test_real_time_source_is_not_simulated() {
        let clock = RealTimeSource;
        assert!(!clock.is_simulated());
        assert!(!clock.is_ended());
    }

    #[test]
    fn test_parse_utc_datetime_formats() {
        assert_eq!(at("2026-05-04 14:23"), at("2026-05-04 14:23:00"));
        assert!(parse_utc_datetime("14:23").is_err());
        assert!(parse_utc_datetime("2026-13-01 00:00").is_err());
    }
}
