//! [`CipherEngine`]: encrypt and decrypt payloads under the managed key.

use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;

use crate::crypto::cipher::{self, CipherError, CipherString, IV_LEN};
use crate::error::CryptoError;
use crate::keys::{KeyManager, MasterKey};

/// Fixed placeholder returned in place of plaintext when decryption fails.
///
/// Callers of the string surface detect failure by comparing against this
/// constant instead of matching an error; existing stored-data consumers
/// depend on the exact text.
pub const DECRYPT_FAILED_SENTINEL: &str = "[error: cannot decrypt]";

/// Outcome of a decrypt call.
///
/// Decryption-time failures are deliberately non-fatal. A wrong key,
/// corrupted ciphertext, bad padding, a malformed token, or a non-UTF-8
/// payload all yield [`Decryption::Failed`] with a logged diagnostic, so a
/// caller rendering a whole vault shows one unreadable value instead of
/// aborting. Missing-key and storage problems remain hard errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decryption {
    /// UTF-8 plaintext recovered under the current master key.
    Plaintext(String),
    /// The value could not be decrypted; the cause was logged.
    Failed,
}

impl Decryption {
    /// The recovered plaintext, if any.
    pub fn as_plaintext(&self) -> Option<&str> {
        match self {
            Decryption::Plaintext(s) => Some(s),
            Decryption::Failed => None,
        }
    }

    /// `true` when decryption failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Decryption::Failed)
    }

    /// Collapse to the legacy string surface: the plaintext on success,
    /// [`DECRYPT_FAILED_SENTINEL`] on failure.
    pub fn into_string(self) -> String {
        match self {
            Decryption::Plaintext(s) => s,
            Decryption::Failed => DECRYPT_FAILED_SENTINEL.to_string(),
        }
    }
}

/// Stateless encrypt/decrypt front end over a [`KeyManager`].
///
/// Calls are independent of one another; the master key is the only shared
/// state and lives in the manager. Encrypts and decrypts may run
/// concurrently, including across a key change: every call pins its own
/// snapshot of the key for its full duration, so an operation in flight
/// completes under the key it started with.
#[derive(Clone)]
pub struct CipherEngine {
    keys: KeyManager,
}

impl CipherEngine {
    /// Create an engine over `keys`.
    pub fn new(keys: KeyManager) -> Self {
        Self { keys }
    }

    /// Encrypt `plaintext` under the master key with a fresh random IV.
    ///
    /// Text callers pass UTF-8 bytes; the payload is otherwise arbitrary.
    /// A new IV comes from the OS CSPRNG on every call. CBC leaks shared
    /// plaintext prefixes between messages encrypted under the same IV and
    /// key, so IVs are never reused or made caller-suppliable.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MissingKey`] when no master key is loaded,
    /// or [`CryptoError::StorageUnavailable`] when the key store fails.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<CipherString, CryptoError> {
        let key = self.require_key()?;
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        let ciphertext = cipher::encrypt_raw(plaintext, &iv, &key);
        Ok(CipherString::new_unchecked(iv, ciphertext))
    }

    /// Decrypt `value` to its UTF-8 plaintext.
    ///
    /// # Errors
    ///
    /// Only precondition failures: [`CryptoError::MissingKey`] and
    /// [`CryptoError::StorageUnavailable`]. Everything that goes wrong
    /// with the value itself is reported as [`Decryption::Failed`].
    pub fn decrypt(&self, value: &CipherString) -> Result<Decryption, CryptoError> {
        let key = self.require_key()?;
        Ok(Self::soft_decrypt(value, &key))
    }

    /// Decrypt a raw cipher-string token.
    ///
    /// A token that does not parse takes the same soft-failure path as one
    /// that parses but will not decrypt, so callers holding opaque stored
    /// strings never abort on garbage.
    ///
    /// # Errors
    ///
    /// Same conditions as [`decrypt`](CipherEngine::decrypt).
    pub fn decrypt_str(&self, token: &str) -> Result<Decryption, CryptoError> {
        let key = self.require_key()?;
        match token.parse::<CipherString>() {
            Ok(value) => Ok(Self::soft_decrypt(&value, &key)),
            Err(e) => {
                warn!(error = %e, "cipher string failed to parse");
                Ok(Decryption::Failed)
            }
        }
    }

    /// [`decrypt`](CipherEngine::decrypt) collapsed to the legacy string
    /// surface, sentinel included.
    ///
    /// # Errors
    ///
    /// Same conditions as [`decrypt`](CipherEngine::decrypt).
    pub fn decrypt_to_string(&self, value: &CipherString) -> Result<String, CryptoError> {
        Ok(self.decrypt(value)?.into_string())
    }

    /// Snapshot the master key or fail the precondition.
    fn require_key(&self) -> Result<Arc<MasterKey>, CryptoError> {
        self.keys.get_key()?.ok_or(CryptoError::MissingKey)
    }

    /// Decryption half that never fails the caller. Every cipher-layer
    /// error collapses to [`Decryption::Failed`] after a diagnostic that
    /// names the cause but never the key or payload.
    fn soft_decrypt(value: &CipherString, key: &MasterKey) -> Decryption {
        let outcome = cipher::decrypt_raw(value, key)
            .and_then(|bytes| String::from_utf8(bytes).map_err(|_| CipherError::Utf8));

        match outcome {
            Ok(plaintext) => Decryption::Plaintext(plaintext),
            Err(e) => {
                warn!(error = %e, "decryption failed");
                Decryption::Failed
            }
        }
    }
}
