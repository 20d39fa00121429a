//! Ten-minute UTC time buckets.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::common::constants::BUCKET_MINUTES;

/// An (hour, ten-minute slot) pair. The minute is always a multiple of ten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimeBucket {
    hour: u8,
    minute: u8,
}

impl TimeBucket {
    /// Build a bucket from its parts. `None` unless `hour < 24` and `minute`
    /// is one of 0, 10, .., 50.
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60 && minute % BUCKET_MINUTES == 0).then_some(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }

    /// Truncate a UTC instant to its bucket.
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self {
            hour: instant.hour() as u8,
            minute: (instant.minute() - instant.minute() % BUCKET_MINUTES) as u8,
        }
    }

    pub fn hour(&self) -> u32 {
        self.hour as u32
    }

    pub fn minute(&self) -> u32 {
        self.minute as u32
    }

    /// Storage path relative to the cache root: `HH/MM`.
    pub fn relative_dir(&self) -> PathBuf {
        PathBuf::from(format!("{:02}", self.hour)).join(format!("{:02}", self.minute))
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// The floored instant an acquisition cycle aims for, with its bucket.
///
/// The instant carries the calendar day, which the bucket alone does not. It
/// decides freshness and fills the date placeholders of source templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AcquisitionTarget {
    pub instant: DateTime<Utc>,
    pub bucket: TimeBucket,
}

impl AcquisitionTarget {
    pub fn for_instant(instant: DateTime<Utc>) -> Self {
        let bucket = TimeBucket::from_instant(instant);
        let floored = instant
            .date_naive()
            .and_hms_opt(bucket.hour(), bucket.minute(), 0)
            .map(|naive| naive.and_utc())
            .unwrap_or(instant);
        Self {
            instant: floored,
            bucket,
        }
    }

    /// The calendar day this bucket is intended for.
    pub fn date(&self) -> NaiveDate {
        self.instant.date_naive()
    }
}

impl fmt::Display for AcquisitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} UTC", self.date(), self.bucket)
    }
}
