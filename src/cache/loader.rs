use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::key::CacheKey;

use super::entry::CacheEntry;
use super::error::CacheError;

/// 現行のキャッシュファイル（キャッシュキーをキーとするJSONオブジェクト）
pub const CACHE_FILENAME: &str = "verifier_cache.json";

/// 旧バージョンが書き出していたタブ区切り形式（`id, epoch, verifier, video`）
pub const LEGACY_CACHE_FILENAME: &str = "verifier_cache.txt";

const LEGACY_SEPARATOR: char = '\t';

/// キャッシュローダー
pub struct CacheLoader {
    path: PathBuf,
    legacy_path: PathBuf,
}

impl CacheLoader {
    pub fn new(save_dir: &Path) -> Self {
        Self {
            path: save_dir.join(CACHE_FILENAME),
            legacy_path: save_dir.join(LEGACY_CACHE_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// ディスクから有効なレコードをすべて読み込む
    ///
    /// ファイルが無ければ空のマップを返す。壊れたレコードは1件ずつスキップし、
    /// 読み込めないファイルやJSONオブジェクトでない文書のみエラーとする。
    pub fn load(&self) -> Result<HashMap<CacheKey, CacheEntry>, CacheError> {
        if self.path.exists() {
            let content = fs::read_to_string(&self.path)?;
            return self.parse_document(&content);
        }
        if self.legacy_path.exists() {
            info!("Reading legacy cache file {}", self.legacy_path.display());
            let content = fs::read_to_string(&self.legacy_path)?;
            return Ok(parse_legacy(&content));
        }
        debug!("No cache file at {}", self.path.display());
        Ok(HashMap::new())
    }

    fn parse_document(&self, content: &str) -> Result<HashMap<CacheKey, CacheEntry>, CacheError> {
        let document: Map<String, Value> = serde_json::from_str(content)?;
        let total = document.len();

        let mut entries = HashMap::with_capacity(total);
        for (key, value) in document {
            match serde_json::from_value::<CacheEntry>(value) {
                Ok(entry) => {
                    entries.insert(CacheKey::from(key), entry);
                }
                Err(e) => warn!("Skipping malformed cache record {}: {}", key, e),
            }
        }

        info!(
            "Loaded {} of {} cache records from {}",
            entries.len(),
            total,
            self.path.display()
        );
        Ok(entries)
    }
}

fn parse_legacy(content: &str) -> HashMap<CacheKey, CacheEntry> {
    let mut entries = HashMap::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        match parse_legacy_line(line) {
            Some((key, entry)) => {
                entries.insert(key, entry);
            }
            None => warn!("Skipping malformed legacy cache line {}", line_no + 1),
        }
    }
    entries
}

fn parse_legacy_line(line: &str) -> Option<(CacheKey, CacheEntry)> {
    let mut parts = line.split(LEGACY_SEPARATOR);
    let id: i64 = parts.next()?.trim().parse().ok()?;
    let epoch: u64 = parts.next()?.trim().parse().ok()?;
    let verifier = parts.next()?.to_string();
    let video = parts.next()?.to_string();
    // a fifth column, when present, is the legacy flag
    let legacy = parts.next().is_some_and(|flag| flag.trim() == "1");

    Some((
        CacheKey::from(id.to_string()),
        CacheEntry::new(verifier, video, legacy, epoch),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CacheLoader::new(dir.path()).load().unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let content = r#"{
            "1": {"verifier": "Alice", "video": "", "legacy": false, "timestamp": 10},
            "2": {"verifier": 42, "video": "", "legacy": false, "timestamp": 10},
            "3": "not an object",
            "4_2p": {"verifier": "", "video": "", "legacy": false, "timestamp": 11}
        }"#;
        fs::write(dir.path().join(CACHE_FILENAME), content).unwrap();

        let loaded = CacheLoader::new(dir.path()).load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[&CacheKey::from("1")].verifier_text, "Alice");
        assert_eq!(loaded[&CacheKey::from("4_2p")], CacheEntry::negative(11));
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CACHE_FILENAME), "{ truncated").unwrap();
        assert!(matches!(
            CacheLoader::new(dir.path()).load(),
            Err(CacheError::Json(_))
        ));
    }

    #[test]
    fn test_legacy_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let content = "100\t1700000000\tZoink\thttps://youtu.be/a\n\
                       garbage line\n\
                       \n\
                       abc\t1\tx\ty\n\
                       200\t1700000001\t\t\t1\n";
        fs::write(dir.path().join(LEGACY_CACHE_FILENAME), content).unwrap();

        let loaded = CacheLoader::new(dir.path()).load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded[&CacheKey::from("100")],
            CacheEntry::new("Zoink".into(), "https://youtu.be/a".into(), false, 1700000000)
        );
        let negative = &loaded[&CacheKey::from("200")];
        assert!(negative.is_negative());
        assert!(negative.legacy);
    }

    #[test]
    fn test_json_file_wins_over_legacy() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LEGACY_CACHE_FILENAME), "1\t1\tOld\t\n").unwrap();
        fs::write(
            dir.path().join(CACHE_FILENAME),
            r#"{"1": {"verifier": "New", "video": "", "legacy": false, "timestamp": 2}}"#,
        )
        .unwrap();

        let loaded = CacheLoader::new(dir.path()).load().unwrap();
        assert_eq!(loaded[&CacheKey::from("1")].verifier_text, "New");
    }
}
