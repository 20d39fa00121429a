//! Scheduled acquisition: image sources, bounded retry, the per-cycle state
//! machine and the daemon loop that drives it.

pub mod daemon;
pub mod retry;
pub mod scheduler;
pub mod source;

pub use daemon::{Daemon, DaemonStats, TriggerSchedule};
pub use retry::{BackoffStrategy, FixedBackoff};
pub use scheduler::{AcquisitionScheduler, CycleOutcome, SchedulerSettings};
pub use source::{ImageSource, TemplateSource, Tile, fetch_raster};
