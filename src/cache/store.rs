//! Durable storage for canonical disk images.
//!
//! Layout: `<root>/<HH>/<MM>/disk.png`, one file per bucket. Writes go to a
//! temporary file in the bucket directory, are synced, stamped with the
//! intended modification time and renamed into place, so a reader opening
//! `disk.png` always gets a complete file.

use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::bucket::TimeBucket;
use crate::common::constants::DISK_FILE_NAME;
use crate::error::StorageError;

/// Metadata of a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    pub modified: DateTime<Utc>,
    pub len: u64,
}

/// Bucket-keyed storage backend.
pub trait DiskStore: Send + Sync {
    /// Where the entry for `bucket` lives (whether or not it exists).
    fn entry_path(&self, bucket: TimeBucket) -> PathBuf;

    /// Metadata of the stored entry, `None` when there is none.
    fn metadata(&self, bucket: TimeBucket) -> Result<Option<EntryMetadata>, StorageError>;

    fn read(&self, bucket: TimeBucket) -> Result<Vec<u8>, StorageError>;

    /// Replace the entry atomically and set its modification time.
    fn write_atomic(
        &self,
        bucket: TimeBucket,
        bytes: &[u8],
        modified: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}

/// Filesystem store rooted at the data directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DiskStore for FsStore {
    fn entry_path(&self, bucket: TimeBucket) -> PathBuf {
        self.root.join(bucket.relative_dir()).join(DISK_FILE_NAME)
    }

    fn metadata(&self, bucket: TimeBucket) -> Result<Option<EntryMetadata>, StorageError> {
        let path = self.entry_path(bucket);
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io("stat", path, e)),
        };
        if !metadata.is_file() {
            return Ok(None);
        }
        let modified = metadata
            .modified()
            .map_err(|e| StorageError::io("stat", &path, e))?;
        Ok(Some(EntryMetadata {
            modified: DateTime::<Utc>::from(modified),
            len: metadata.len(),
        }))
    }

    fn read(&self, bucket: TimeBucket) -> Result<Vec<u8>, StorageError> {
        let path = self.entry_path(bucket);
        fs::read(&path).map_err(|e| StorageError::io("read", path, e))
    }

    fn write_atomic(
        &self,
        bucket: TimeBucket,
        bytes: &[u8],
        modified: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let path = self.entry_path(bucket);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&dir).map_err(|e| StorageError::io("create", &dir, e))?;

        // Same directory as the target so the rename never crosses filesystems
        let mut temp = tempfile::Builder::new()
            .prefix(".disk-")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|e| StorageError::io("create temporary file in", &dir, e))?;

        temp.write_all(bytes)
            .map_err(|e| StorageError::io("write", temp.path(), e))?;
        temp.as_file()
            .set_modified(SystemTime::from(modified))
            .map_err(|e| StorageError::io("set modification time of", temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| StorageError::io("sync", temp.path(), e))?;

        temp.persist(&path)
            .map_err(|e| StorageError::io("publish", &path, e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_utc_datetime;
    use tempfile::tempdir;

    fn bucket() -> TimeBucket {
        TimeBucket::new(14, 20).unwrap()
    }

    #[test]
    fn test_entry_path_layout() {
        let store = FsStore::new("/data");
        assert_eq!(
            store.entry_path(bucket()),
            PathBuf::from("/data/14/20/disk.png")
        );
    }

    #[test]
    fn test_missing_entry_has_no_metadata() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path());
        assert_eq!(store.metadata(bucket()).unwrap(), None);
        assert!(store.read(bucket()).is_err());
    }

    #[test]
    fn test_write_atomic_sets_content_and_mtime() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let modified = parse_utc_datetime("2026-05-04 14:20").unwrap();

        store.write_atomic(bucket(), b"first", modified).unwrap();
        store.write_atomic(bucket(), b"second", modified).unwrap();

        assert_eq!(store.read(bucket()).unwrap(), b"second");
        let metadata = store.metadata(bucket()).unwrap().unwrap();
        assert_eq!(metadata.modified, modified);
        assert_eq!(metadata.len, 6);

        // No temporary files left behind
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("14").join("20"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != DISK_FILE_NAME)
            .collect();
        assert!(leftovers.is_empty());
    }
}
