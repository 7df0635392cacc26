use crate::cache::CacheEntry;
use crate::key::CacheKey;

/// The screen showing verifier info.
///
/// `refresh` is called from the fetch task, not from the UI thread;
/// implementations hop to their own thread before touching UI state.
pub trait View: Send + Sync {
    /// Key of the record currently on screen, if any
    fn displayed_key(&self) -> Option<CacheKey>;

    fn refresh(&self, key: &CacheKey, entry: &CacheEntry);
}

/// View that never displays anything
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl View for Headless {
    fn displayed_key(&self) -> Option<CacheKey> {
        None
    }

    fn refresh(&self, _key: &CacheKey, _entry: &CacheEntry) {}
}
