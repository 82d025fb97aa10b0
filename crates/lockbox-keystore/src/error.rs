//! Error type shared by all key-store backends.

use thiserror::Error;

/// Errors produced by a [`KeyStore`](crate::KeyStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not complete the operation. The message carries
    /// backend-specific detail and is safe to log.
    #[error("key store backend error: {0}")]
    Backend(String),

    /// An underlying filesystem or OS call failed.
    #[error("key store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The entry exists but its contents are not usable.
    #[error("malformed key store entry {name:?}: {reason}")]
    MalformedEntry { name: String, reason: String },
}
