//! Lock file management for single-instance enforcement.
//!
//! One acquisition daemon may write to a data directory at a time. The lock is
//! an `flock`-style exclusive lock held for the lifetime of [`LockGuard`]; the
//! kernel releases it when the process dies, so a leftover file from a crashed
//! daemon never blocks a new one.
//!
//! The guard unlinks the file before unlocking it, and a new holder checks that
//! the inode it locked is still the one at the lock path. Together these stop a
//! process that opened the file just before release from locking an orphaned
//! inode while a third process locks a freshly created file.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use crate::common::constants::LOCK_FILE_NAME;
use crate::common::utils::private_path;

/// Attempts to lock a path whose file is replaced between open and lock.
const LOCK_ATTEMPTS: u32 = 3;

/// Held lock; removed and unlocked on drop.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        let _ = self.file.unlock();
    }
}

/// Outcome of a lock attempt.
#[derive(Debug)]
pub enum LockStatus {
    Acquired(LockGuard),
    /// Another process holds the lock; carries its PID when readable.
    Held { pid: Option<u32> },
}

/// Path of the lock file for a data directory.
pub fn lock_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LOCK_FILE_NAME)
}

/// Try to take the exclusive lock for `data_dir`, writing our PID into it.
pub fn acquire_lock(data_dir: &Path) -> Result<LockStatus> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", private_path(data_dir)))?;
    let path = lock_path(data_dir);

    for _ in 0..LOCK_ATTEMPTS {
        // Open without truncating so a running holder's PID stays readable
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file {}", private_path(&path)))?;

        if file.try_lock_exclusive().is_err() {
            return Ok(LockStatus::Held {
                pid: read_lock_pid(&path),
            });
        }

        // The previous holder unlinked the file after we opened it
        if !is_current(&file, &path) {
            continue;
        }

        write_pid(&mut file)?;
        return Ok(LockStatus::Acquired(LockGuard { file, path }));
    }

    anyhow::bail!(
        "Lock file {} kept being replaced while locking",
        private_path(&path)
    )
}

/// Whether `file` is still the file linked at `path`.
fn is_current(file: &File, path: &Path) -> bool {
    match (file.metadata(), std::fs::metadata(path)) {
        (Ok(held), Ok(linked)) => held.dev() == linked.dev() && held.ino() == linked.ino(),
        _ => false,
    }
}

fn write_pid(file: &mut File) -> Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()?;
    Ok(())
}

/// PID recorded in an existing lock file.
pub fn read_lock_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()?
        .lines()
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Whether another process currently holds the lock for `data_dir`.
pub fn is_locked(data_dir: &Path) -> bool {
    let path = lock_path(data_dir);
    let Ok(file) = OpenOptions::new().read(true).write(true).open(&path) else {
        return false;
    };
    match file.try_lock_exclusive() {
        Ok(()) => {
            let _ = file.unlock();
            false
        }
        Err(_) => true,
    }
}
