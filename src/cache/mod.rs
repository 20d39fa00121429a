//! Time-bucketed freshness cache of canonical disk images.
//!
//! Each ten-minute bucket holds at most one image. An entry only counts when
//! its modification date matches the day the bucket is meant for, so after
//! midnight yesterday's `14:20` is never served for today's `14:20`.
//!
//! The scheduler is the single writer; any number of renderers may read.
//! Publishing goes through [`DiskStore::write_atomic`], so readers never need
//! a lock.

pub mod bucket;
pub mod store;

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

pub use bucket::{AcquisitionTarget, TimeBucket};
pub use store::{DiskStore, EntryMetadata, FsStore};

use crate::error::StorageError;
use crate::imaging::CanonicalDiskImage;

/// A stored entry and the target it is judged against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub target: AcquisitionTarget,
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

impl CacheEntry {
    /// Fresh iff last-modified falls on the bucket's intended UTC day.
    pub fn is_fresh(&self) -> bool {
        self.modified.date_naive() == self.target.date()
    }
}

/// Read and publish access to the bucket cache.
#[derive(Clone)]
pub struct FreshnessCache {
    store: Arc<dyn DiskStore>,
}

impl FreshnessCache {
    pub fn new(store: Arc<dyn DiskStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn DiskStore {
        self.store.as_ref()
    }

    /// Entry metadata for the bucket containing `instant`, fresh or not.
    pub fn entry(&self, instant: DateTime<Utc>) -> Option<CacheEntry> {
        let target = AcquisitionTarget::for_instant(instant);
        match self.store.metadata(target.bucket) {
            Ok(Some(metadata)) => Some(CacheEntry {
                target,
                path: self.store.entry_path(target.bucket),
                modified: metadata.modified,
            }),
            Ok(None) => None,
            Err(e) => {
                log_warning!("Cache entry for {} unreadable: {e}", target.bucket);
                None
            }
        }
    }

    /// The image for `instant` if present and fresh. Never touches the network.
    pub fn lookup(&self, instant: DateTime<Utc>) -> Option<CanonicalDiskImage> {
        let entry = self.entry(instant)?;
        if !entry.is_fresh() {
            return None;
        }

        let bytes = match self.store.read(entry.target.bucket) {
            Ok(bytes) => bytes,
            Err(e) => {
                log_warning!("Cache entry for {} unreadable: {e}", entry.target.bucket);
                return None;
            }
        };

        match CanonicalDiskImage::decode_png(&bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                log_warning!("Cache entry for {} is corrupt: {e}", entry.target.bucket);
                None
            }
        }
    }

    /// Encode and atomically replace the entry for `target`.
    ///
    /// The file's modification time is set to the target instant, which keeps
    /// freshness tied to the bucket's day even when publishing runs late.
    pub fn publish(
        &self,
        target: &AcquisitionTarget,
        image: &CanonicalDiskImage,
    ) -> Result<(), StorageError> {
        let bytes = image.encode_png().map_err(StorageError::Encode)?;
        self.store.write_atomic(target.bucket, &bytes, target.instant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_canonical_disk;
    use crate::time::parse_utc_datetime;
    use tempfile::tempdir;

    fn cache_in(dir: &std::path::Path) -> FreshnessCache {
        FreshnessCache::new(Arc::new(FsStore::new(dir)))
    }

    #[test]
    fn test_lookup_is_bucket_granular() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        let target =
            AcquisitionTarget::for_instant(parse_utc_datetime("2026-05-04 14:20").unwrap());
        let image = synthetic_canonical_disk(32);
        cache.publish(&target, &image).unwrap();

        let first = cache
            .lookup(parse_utc_datetime("2026-05-04 14:21").unwrap())
            .unwrap();
        let second = cache
            .lookup(parse_utc_datetime("2026-05-04 14:29:59").unwrap())
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first, image);
        assert!(cache.lookup(parse_utc_datetime("2026-05-04 14:30").unwrap()).is_none());
    }

    #[test]
    fn test_stale_day_is_absent() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        let yesterday =
            AcquisitionTarget::for_instant(parse_utc_datetime("2026-05-03 14:20").unwrap());
        cache.publish(&yesterday, &synthetic_canonical_disk(32)).unwrap();

        let today = parse_utc_datetime("2026-05-04 14:25").unwrap();
        let entry = cache.entry(today).unwrap();
        assert!(entry.path.exists());
        assert!(!entry.is_fresh());
        assert!(cache.lookup(today).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_absent() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        let instant = parse_utc_datetime("2026-05-04 09:00").unwrap();
        let target = AcquisitionTarget::for_instant(instant);
        cache
            .store()
            .write_atomic(target.bucket, b"not a png", target.instant)
            .unwrap();

        assert!(cache.entry(instant).unwrap().is_fresh());
        assert!(cache.lookup(instant).is_none());
    }

    #[test]
    fn test_readers_see_whole_images_while_entry_is_replaced() {
        use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        let target =
            AcquisitionTarget::for_instant(parse_utc_datetime("2026-05-04 14:20").unwrap());
        let instant = parse_utc_datetime("2026-05-04 14:25").unwrap();
        let first = synthetic_canonical_disk(32);
        let second = synthetic_canonical_disk(48);
        cache.publish(&target, &first).unwrap();

        let done = AtomicBool::new(false);
        let reads = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for round in 0..100 {
                    let image = if round % 2 == 0 { &second } else { &first };
                    cache.publish(&target, image).unwrap();
                }
                done.store(true, Ordering::SeqCst);
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    loop {
                        let finished = done.load(Ordering::SeqCst);
                        let disk = cache
                            .lookup(instant)
                            .expect("entry stays present while it is replaced");
                        assert!(disk == first || disk == second, "torn read");
                        reads.fetch_add(1, Ordering::SeqCst);
                        if finished {
                            break;
                        }
                    }
                });
            }
        });

        assert!(reads.load(Ordering::SeqCst) >= 4);
        // The last round published `first`
        assert_eq!(cache.lookup(instant).unwrap(), first);
    }

    #[test]
    fn test_missing_entry_is_absent() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        let instant = parse_utc_datetime("2026-05-04 09:00").unwrap();
        assert!(cache.entry(instant).is_none());
        assert!(cache.lookup(instant).is_none());
    }
}
