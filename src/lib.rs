pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod key;
pub mod remote;

pub use cache::{CacheEntry, DiskCache, VerifierCache};
pub use config::Settings;
pub use fetch::{FetchOutcome, Fetcher, Lookup, View};
pub use key::{CacheKey, LevelRequest, Variant};
