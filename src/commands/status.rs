//! Status command - report the bucket the daemon targets.
//!
//! Reads the cache and the lock file directly; no running daemon is needed.
//! Supports JSON and human-readable output.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::common::constants::EXIT_SUCCESS;
use crate::common::logger::Log;
use crate::common::utils::private_path;
use crate::config;
use crate::io::lock::{is_locked, lock_path, read_lock_pid};
use crate::service::{CacheStatus, WallpaperService};

/// Everything `earthpaper status` reports.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    #[serde(flatten)]
    pub cache: CacheStatus,
    pub daemon_running: bool,
    pub daemon_pid: Option<u32>,
}

/// Handle the status command.
pub fn handle_status_command(json: bool) -> Result<i32> {
    if json {
        // Only the JSON document may reach stdout
        Log::set_enabled(false);
    }

    let config = config::load()?;
    let data_dir = config.data_dir()?;
    let service = WallpaperService::from_config(&config)?;

    let daemon_running = is_locked(&data_dir);
    let report = StatusReport {
        cache: service.cache_status(Utc::now()),
        daemon_running,
        daemon_pid: daemon_running
            .then(|| read_lock_pid(&lock_path(&data_dir)))
            .flatten(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display_human_readable(&report, &private_path(&data_dir));
    }
    Ok(EXIT_SUCCESS)
}

fn display_human_readable(report: &StatusReport, data_dir: &str) {
    log_version!();
    log_block_start!("Cache: {data_dir}");
    log_indented!("Target bucket: {}", report.cache.target);
    match report.cache.modified {
        Some(modified) => log_indented!(
            "Stored image:  {} ({})",
            format_age(Utc::now(), modified),
            if report.cache.fresh { "fresh" } else { "stale" }
        ),
        None => log_indented!("Stored image:  none"),
    }
    match (report.daemon_running, report.daemon_pid) {
        (true, Some(pid)) => log_indented!("Daemon:        running (PID {pid})"),
        (true, None) => log_indented!("Daemon:        running"),
        (false, _) => log_indented!("Daemon:        not running"),
    }
    log_end!();
}

/// "3h 12m ago" style age of a timestamp.
fn format_age(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes();
    if minutes < 0 {
        return "in the future".to_string();
    }
    match (minutes / 1440, minutes / 60 % 24, minutes % 60) {
        (0, 0, m) => format!("{m}m ago"),
        (0, h, m) => format!("{h}h {m}m ago"),
        (d, h, _) => format!("{d}d {h}h ago"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{AcquisitionTarget, TimeBucket};
    use crate::time::parse_utc_datetime;

    #[test]
    fn test_format_age() {
        let now = parse_utc_datetime("2026-05-04 12:00").unwrap();
        let at = |s| parse_utc_datetime(s).unwrap();
        assert_eq!(format_age(now, at("2026-05-04 11:53")), "7m ago");
        assert_eq!(format_age(now, at("2026-05-04 08:48")), "3h 12m ago");
        assert_eq!(format_age(now, at("2026-05-02 09:00")), "2d 3h ago");
        assert_eq!(format_age(now, at("2026-05-04 12:05")), "in the future");
    }

    #[test]
    fn test_json_report_is_flat() {
        let target =
            AcquisitionTarget::for_instant(parse_utc_datetime("2026-05-04 11:47").unwrap());
        let report = StatusReport {
            cache: CacheStatus {
                bucket: target.bucket,
                target,
                fresh: false,
                modified: None,
            },
            daemon_running: false,
            daemon_pid: None,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["fresh"], false);
        assert_eq!(value["daemon_running"], false);
        assert_eq!(value["bucket"]["hour"], 11);
        assert_eq!(value["bucket"]["minute"], 40);
        assert_eq!(target.bucket, TimeBucket::new(11, 40).unwrap());
    }
}
