//! Key-value blob store contract.

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The medium is full. Distinct from generic write failures.
    #[error("Storage quota exceeded")]
    QuotaExceeded,
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed future returned by store operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// An opaque key-value blob store.
///
/// Values are whole blobs; there is no partial update.
pub trait Store: Send + Sync {
    /// Read a value. A missing key is `Ok(None)`.
    fn get(&self, key: &str) -> BoxFuture<'_, StoreResult<Option<Vec<u8>>>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, StoreResult<()>>;

    /// Remove a value. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> BoxFuture<'_, StoreResult<()>>;
}
