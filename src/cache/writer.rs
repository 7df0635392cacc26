use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::key::CacheKey;

use super::entry::CacheEntry;
use super::error::CacheError;
use super::loader::{CACHE_FILENAME, LEGACY_CACHE_FILENAME};

/// Cache writer
pub struct CacheWriter {
    save_dir: PathBuf,
}

impl CacheWriter {
    pub fn new(save_dir: &Path) -> Self {
        Self {
            save_dir: save_dir.to_path_buf(),
        }
    }

    fn ensure_save_dir(&self) -> io::Result<()> {
        if !self.save_dir.exists() {
            fs::create_dir_all(&self.save_dir)?;
        }
        Ok(())
    }

    /// Replace the cache file with `snapshot`.
    ///
    /// The document is written to a temporary file next to the target and
    /// renamed over it, so a failed write leaves the previous file intact.
    pub fn save(&self, snapshot: &HashMap<CacheKey, CacheEntry>) -> Result<(), CacheError> {
        self.ensure_save_dir()?;

        // sorted keys keep the file diffable between saves
        let ordered: BTreeMap<&CacheKey, &CacheEntry> = snapshot.iter().collect();
        let json = serde_json::to_string_pretty(&ordered)?;

        let mut tmp = NamedTempFile::new_in(&self.save_dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.save_dir.join(CACHE_FILENAME))?;

        debug!("Saved cache: {} entries, {} bytes", snapshot.len(), json.len());
        Ok(())
    }

    /// Delete the cache file along with any legacy file.
    pub fn remove(&self) -> Result<(), CacheError> {
        for name in [CACHE_FILENAME, LEGACY_CACHE_FILENAME] {
            match fs::remove_file(self.save_dir.join(name)) {
                Ok(()) => info!("Removed cache file {}", name),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
