//! The acquisition loop.
//!
//! Runs one cycle at startup, then one per trigger. Triggers are wall-clock
//! aligned: with `interval = 10` and `phase = 5` they fire at :05, :15, :25 and
//! so on, whatever time the daemon started. A cycle that overruns one or more
//! triggers is handled by the [`OverlapPolicy`]: `skip` drops them, `queue`
//! runs a single catch-up cycle right away.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::sync::mpsc::TryRecvError;
use std::time::Duration;

use super::retry::interruptible_sleep;
use super::scheduler::{AcquisitionScheduler, CycleOutcome};
use crate::common::constants::LOOP_POLL_INTERVAL_MS;
use crate::config::OverlapPolicy;
use crate::io::signals::{SignalMessage, SignalState};
use crate::time::TimeSource;

/// Epoch-aligned trigger instants `k · interval + phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerSchedule {
    interval_seconds: i64,
    phase_seconds: i64,
}

impl TriggerSchedule {
    /// `interval` and `phase` in minutes. A zero interval is treated as one.
    pub fn new(interval_minutes: u64, phase_minutes: u64) -> Self {
        let interval_seconds = interval_minutes.max(1) as i64 * 60;
        Self {
            interval_seconds,
            phase_seconds: (phase_minutes as i64 * 60).rem_euclid(interval_seconds),
        }
    }

    /// First trigger strictly after `instant`.
    pub fn next_after(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let seconds = instant.timestamp() - self.phase_seconds;
        let k = seconds.div_euclid(self.interval_seconds) + 1;
        Utc.timestamp_opt(k * self.interval_seconds + self.phase_seconds, 0)
            .single()
            .unwrap_or(instant + ChronoDuration::seconds(self.interval_seconds))
    }

    /// Triggers `t` with `from <= t <= until`, `from` being a trigger.
    fn count_from(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> u64 {
        if until < from {
            return 0;
        }
        ((until - from).num_seconds() / self.interval_seconds) as u64 + 1
    }
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaemonStats {
    pub cycles: u64,
    pub published: u64,
    pub up_to_date: u64,
    pub failed: u64,
    /// Triggers that fired while a cycle was running and were not run.
    pub missed_triggers: u64,
}

pub struct Daemon {
    scheduler: AcquisitionScheduler,
    schedule: TriggerSchedule,
    overlap: OverlapPolicy,
    clock: Arc<dyn TimeSource>,
    signals: SignalState,
}

impl Daemon {
    pub fn new(
        scheduler: AcquisitionScheduler,
        schedule: TriggerSchedule,
        overlap: OverlapPolicy,
        signals: SignalState,
    ) -> Self {
        let clock = scheduler.clock().clone();
        Self {
            scheduler: scheduler.with_running_flag(signals.running.clone()),
            schedule,
            overlap,
            clock,
            signals,
        }
    }

    /// Run until shutdown or, with a simulated clock, until its end time.
    pub fn run(self) -> DaemonStats {
        let mut stats = DaemonStats::default();
        let mut next = self.schedule.next_after(self.clock.now());
        let mut catch_up = false;

        log_block_start!("Running startup acquisition cycle");
        self.cycle(&mut stats, &mut next, &mut catch_up);

        while self.is_running() {
            if catch_up {
                catch_up = false;
                log_block_start!("Running queued catch-up cycle");
                self.cycle(&mut stats, &mut next, &mut catch_up);
                continue;
            }

            match self.signals.signal_receiver.try_recv() {
                Ok(SignalMessage::Refresh) => {
                    log_block_start!("Refresh requested");
                    self.cycle(&mut stats, &mut next, &mut catch_up);
                    continue;
                }
                Ok(SignalMessage::Shutdown) => break,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }

            let now = self.clock.now();
            if now >= next {
                next = self.schedule.next_after(now);
                self.cycle(&mut stats, &mut next, &mut catch_up);
                continue;
            }

            let wait = (next - now).to_std().unwrap_or_default();
            let wait = if self.clock.is_simulated() {
                wait
            } else {
                wait.min(Duration::from_millis(LOOP_POLL_INTERVAL_MS))
            };
            interruptible_sleep(self.clock.as_ref(), wait, &self.signals.running);
        }

        log_block_start!(
            "Acquisition loop stopped after {} cycle(s): {} published, {} up to date, {} failed",
            stats.cycles,
            stats.published,
            stats.up_to_date,
            stats.failed
        );
        if stats.missed_triggers > 0 {
            log_indented!("{} trigger(s) dropped while cycles ran", stats.missed_triggers);
        }
        stats
    }

    fn is_running(&self) -> bool {
        self.signals.running.load(Ordering::SeqCst) && !self.clock.is_ended()
    }

    /// Run a cycle, then account for triggers it overran.
    fn cycle(&self, stats: &mut DaemonStats, next: &mut DateTime<Utc>, catch_up: &mut bool) {
        match self.scheduler.run_cycle() {
            CycleOutcome::UpToDate(_) => stats.up_to_date += 1,
            CycleOutcome::Published { .. } => stats.published += 1,
            CycleOutcome::Failed { .. } => stats.failed += 1,
            CycleOutcome::Skipped => return,
        }
        stats.cycles += 1;

        let finished = self.clock.now();
        let overran = self.schedule.count_from(*next, finished);
        if overran == 0 {
            return;
        }
        *next = self.schedule.next_after(finished);

        match self.overlap {
            OverlapPolicy::Skip => {
                stats.missed_triggers += overran;
                log_decorated!("Cycle overran {overran} trigger(s), skipping");
            }
            OverlapPolicy::Queue => {
                stats.missed_triggers += overran - 1;
                *catch_up = true;
                log_decorated!("Cycle overran {overran} trigger(s), queueing one catch-up");
            }
        }
    }
}
