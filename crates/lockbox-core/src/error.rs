//! Public error type for the crypto core.

use lockbox_keystore::StoreError;
use thiserror::Error;

/// Errors surfaced by key management and encryption entry points.
///
/// Decryption-time failures (wrong key, corrupt ciphertext, bad padding,
/// invalid UTF-8) are deliberately absent: they collapse into a soft
/// [`Decryption::Failed`](crate::crypto::Decryption::Failed) outcome so
/// that call sites iterating over stored data never abort on one bad
/// value. Only preconditions fail hard.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encrypt or decrypt was attempted with no master key loaded.
    #[error("no master key is loaded")]
    MissingKey,

    /// A caller-supplied argument failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The persistent key store could not complete a read, write, or
    /// delete. Surfaced immediately; the core never retries.
    #[error("key store unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),
}
