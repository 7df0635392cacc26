use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::key::CacheKey;

use super::entry::CacheEntry;

/// In-memory verifier cache shared by the view and the fetch tasks.
///
/// A single readers-writer lock guards the whole table so `snapshot` never
/// observes a half-applied `insert` or `clear`. No I/O happens under the lock.
#[derive(Debug, Default)]
pub struct VerifierCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl VerifierCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: HashMap<CacheKey, CacheEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// `None` only when the key was never written; negative entries are returned.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Last write wins
    pub fn insert(&self, key: CacheKey, entry: CacheEntry) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);
    }

    pub fn snapshot(&self) -> HashMap<CacheKey, CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::key::Variant;

    fn entry(name: &str, at: u64) -> CacheEntry {
        CacheEntry::new(name.to_string(), String::new(), false, at)
    }

    #[test]
    fn test_insert_then_get() {
        let cache = VerifierCache::new();
        let key = CacheKey::new(1, Variant::Solo);
        cache.insert(key.clone(), entry("Alice", 1));
        assert_eq!(cache.get(&key), Some(entry("Alice", 1)));
    }

    #[test]
    fn test_negative_entry_is_a_hit() {
        let cache = VerifierCache::new();
        let key = CacheKey::new(12345, Variant::Solo);
        assert_eq!(cache.get(&key), None);

        cache.insert(key.clone(), CacheEntry::negative(10));
        assert_eq!(cache.get(&key), Some(CacheEntry::negative(10)));
        assert!(cache.contains(&key));
    }

    #[test]
    fn test_insert_replaces() {
        let cache = VerifierCache::new();
        let key = CacheKey::from("9");
        cache.insert(key.clone(), entry("Old", 1));
        cache.insert(key.clone(), entry("New", 2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key).unwrap().verifier_text, "New");
    }

    #[test]
    fn test_clear() {
        let cache = VerifierCache::new();
        cache.insert(CacheKey::from("1"), entry("A", 1));
        cache.insert(CacheKey::from("2"), entry("B", 1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&CacheKey::from("1")), None);
    }

    #[test]
    fn test_snapshot_holds_last_write_per_key() {
        let cache = Arc::new(VerifierCache::new());

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for round in 0..100u64 {
                        let key = CacheKey::new(w + 1, Variant::Solo);
                        cache.insert(key, entry(&format!("w{}", w), round));
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let _ = cache.get(&CacheKey::new(1, Variant::Solo));
                        let _ = cache.snapshot();
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 4);
        for w in 0..4i64 {
            let stored = &snapshot[&CacheKey::new(w + 1, Variant::Solo)];
            assert_eq!(stored, &entry(&format!("w{}", w), 99));
        }
    }
}
