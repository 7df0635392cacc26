use thiserror::Error;

pub use crate::cache::CacheError;

/// HTTP collaborator errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}
