pub mod disk;
pub mod entry;
pub mod error;
pub mod loader;
pub mod store;
pub mod writer;

pub use disk::DiskCache;
pub use entry::CacheEntry;
pub use error::CacheError;
pub use loader::CacheLoader;
pub use store::VerifierCache;
pub use writer::CacheWriter;
