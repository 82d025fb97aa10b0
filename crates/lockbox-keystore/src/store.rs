//! The persistent-storage contract consumed by the key manager.

use crate::error::StoreError;

/// Opaque persistent store of named byte blobs.
///
/// The core keeps exactly one entry here (the master key), but the
/// contract is deliberately general so a backend can be shared with other
/// parts of a host application. Semantics required of implementations:
///
/// - `retrieve` of an absent name is `Ok(None)`, not an error.
/// - `store` overwrites silently.
/// - `delete` of an absent name is a no-op `Ok(())`.
///
/// Implementations must be safe to call from multiple threads; callers
/// hold backends behind `Arc<dyn KeyStore>`.
pub trait KeyStore: Send + Sync {
    /// Read the value stored under `name`, if any.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when the backend cannot complete the read.
    /// Absence of the entry is not an error.
    fn retrieve(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write `value` under `name`, replacing any existing value.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when the backend cannot complete the
    /// write. After an error the previous value may or may not survive;
    /// callers treat the entry as suspect and re-store.
    fn store(&self, name: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Remove the entry stored under `name`.
    ///
    /// # Errors
    /// Returns a [`StoreError`] only when the backend fails; deleting an
    /// absent entry succeeds.
    fn delete(&self, name: &str) -> Result<(), StoreError>;
}
