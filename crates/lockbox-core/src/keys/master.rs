//! [`MasterKey`]: the 256-bit secret every payload is encrypted under.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::crypto::KEY_LEN;
use crate::error::CryptoError;

/// Fixed-size buffer holding exactly [`KEY_LEN`] bytes of key material.
///
/// Clones are independent allocations. Each buffer is overwritten with
/// zeroes when dropped, so key material does not linger in freed memory,
/// and the `Debug` impl never prints the bytes.
#[derive(Clone)]
pub struct MasterKey(Box<[u8; KEY_LEN]>);

impl MasterKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(Box::new(bytes))
    }

    /// Wrap a slice of raw key bytes.
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidArgument`] if `bytes` is not exactly
    /// [`KEY_LEN`] bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidArgument(format!(
                "key material must be {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self::new(arr))
    }

    /// Generate a fresh key from the operating system CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self::new(bytes)
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Standard base64 encoding of the key bytes, for export surfaces.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0.as_slice())
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("MasterKey([REDACTED])")
    }
}
