// Time abstractions shared by the scheduler, the daemon loop and rendering
pub mod source;

pub use source::{RealTimeSource, SimulatedTimeSource, TimeSource, parse_utc_datetime};
