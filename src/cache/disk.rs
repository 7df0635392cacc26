use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, error, warn};

use crate::key::CacheKey;

use super::entry::CacheEntry;
use super::error::CacheError;
use super::loader::CacheLoader;
use super::store::VerifierCache;
use super::writer::CacheWriter;

struct Files {
    loader: CacheLoader,
    writer: CacheWriter,
}

/// Persistence of the verifier cache.
///
/// When constructed with [`DiskCache::disabled`] every operation is a no-op
/// and the [`VerifierCache`] lives purely in memory.
pub struct DiskCache {
    files: Option<Files>,
    // serializes writers so an older snapshot never lands after a newer one
    write_lock: Mutex<()>,
}

impl DiskCache {
    pub fn new(save_dir: &Path) -> Self {
        Self {
            files: Some(Files {
                loader: CacheLoader::new(save_dir),
                writer: CacheWriter::new(save_dir),
            }),
            write_lock: Mutex::new(()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            files: None,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.files.as_ref().map(|f| f.loader.path().to_path_buf())
    }

    /// Load the persisted snapshot. Failures are logged and yield an empty map.
    pub fn load(&self) -> HashMap<CacheKey, CacheEntry> {
        let Some(files) = &self.files else {
            return HashMap::new();
        };
        match files.loader.load() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to load cache, starting empty: {}", e);
                HashMap::new()
            }
        }
    }

    pub fn save(&self, snapshot: &HashMap<CacheKey, CacheEntry>) -> Result<(), CacheError> {
        let Some(files) = &self.files else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        files.writer.save(snapshot)
    }

    /// Snapshot `cache` and write it out.
    ///
    /// The snapshot is taken after acquiring the write lock, so concurrent
    /// flushes always leave the latest state on disk. The store lock is only
    /// held while copying. Errors are logged; the in-memory cache stays valid.
    pub fn flush(&self, cache: &VerifierCache) {
        self.flush_if(cache, || true);
    }

    /// Like [`DiskCache::flush`], but `still_wanted` is checked once the write
    /// lock is held and the write is skipped when it returns false.
    pub fn flush_if(&self, cache: &VerifierCache, still_wanted: impl FnOnce() -> bool) {
        let Some(files) = &self.files else {
            return;
        };
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if !still_wanted() {
            debug!("Skipping cache flush");
            return;
        }
        let snapshot = cache.snapshot();
        if let Err(e) = files.writer.save(&snapshot) {
            error!("Failed to save cache to disk: {}", e);
        }
    }

    /// Delete the backing file
    pub fn remove(&self) -> Result<(), CacheError> {
        let Some(files) = &self.files else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        files.writer.remove()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::loader::CACHE_FILENAME;

    #[test]
    fn test_disabled_is_noop() {
        let disk = DiskCache::disabled();
        let cache = VerifierCache::new();
        cache.insert(CacheKey::from("1"), CacheEntry::negative(1));

        disk.flush(&cache);
        disk.save(&cache.snapshot()).unwrap();
        disk.remove().unwrap();
        assert!(disk.load().is_empty());
        assert!(disk.path().is_none());
    }

    #[test]
    fn test_flush_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let disk = DiskCache::new(dir.path());
        let cache = VerifierCache::new();
        cache.insert(CacheKey::from("12345"), CacheEntry::negative(7));

        disk.flush(&cache);

        let reloaded = DiskCache::new(dir.path()).load();
        assert_eq!(reloaded, cache.snapshot());
    }

    #[test]
    fn test_flush_if_unwanted_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let disk = DiskCache::new(dir.path());
        let cache = VerifierCache::new();
        cache.insert(CacheKey::from("1"), CacheEntry::negative(1));

        disk.flush_if(&cache, || false);
        assert!(!dir.path().join(CACHE_FILENAME).exists());

        disk.flush_if(&cache, || true);
        assert!(dir.path().join(CACHE_FILENAME).exists());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CACHE_FILENAME), "[1, 2").unwrap();
        assert!(DiskCache::new(dir.path()).load().is_empty());
    }

    #[test]
    fn test_flush_failure_keeps_memory() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where the save directory should be
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, "").unwrap();

        let disk = DiskCache::new(&blocked);
        let cache = VerifierCache::new();
        cache.insert(CacheKey::from("1"), CacheEntry::negative(1));
        disk.flush(&cache);

        assert!(disk.save(&cache.snapshot()).is_err());
        assert_eq!(cache.get(&CacheKey::from("1")), Some(CacheEntry::negative(1)));
    }
}
