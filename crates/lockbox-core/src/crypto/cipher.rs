//! AES-256-CBC encryption and decryption of individual payloads, and the
//! cipher-string format they travel in.
//!
//! **Algorithm choice:** AES-256 in CBC mode with PKCS7 padding is fixed by
//! the stored-data format. Every cipher string already persisted by client
//! installs was produced with exactly this construction, so the algorithm,
//! padding, and token layout cannot change without a data migration.
//!
//! The format carries no authentication tag. Padding validation is the only
//! integrity signal, and it is probabilistic: roughly 1 in 256 corrupted or
//! wrong-key decryptions will unpad cleanly and yield garbage. Callers get
//! that reality through the engine's soft-failure decrypt surface rather
//! than through a hard tamper error this mode cannot honestly provide.

use std::fmt;
use std::str::FromStr;

use aes::Aes256;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::keys::MasterKey;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of a CBC initialisation vector (one AES block).
pub const IV_LEN: usize = 16;

/// AES block length. Valid ciphertext is always a positive multiple of it.
pub const BLOCK_LEN: usize = 16;

/// Separator between the two base64 segments of a cipher string.
///
/// `|` never occurs in the standard base64 alphabet, so tokens split
/// unambiguously. The choice is permanent for a deployment: changing it
/// orphans every stored value.
pub const SEGMENT_SEPARATOR: char = '|';

/// One encrypted payload: an IV paired with block-aligned ciphertext.
///
/// The string representation is `<base64(iv)>|<base64(ciphertext)>` using
/// standard padded base64 on both segments. Values round-trip through
/// [`Display`](fmt::Display) / [`FromStr`] and serialise as that single
/// token, so they embed directly in JSON vault documents as ordinary
/// strings.
///
/// Construction always enforces the format invariants: the IV is exactly
/// [`IV_LEN`] bytes and the ciphertext is a positive multiple of
/// [`BLOCK_LEN`]. A value of this type is therefore structurally valid,
/// though nothing guarantees it decrypts under any particular key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherString {
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
}

impl CipherString {
    /// Assemble a value from raw parts.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidCiphertextLength`] if `ciphertext` is
    /// empty or not block-aligned.
    pub fn from_parts(iv: [u8; IV_LEN], ciphertext: Vec<u8>) -> Result<Self, CipherError> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(CipherError::InvalidCiphertextLength(ciphertext.len()));
        }
        Ok(Self { iv, ciphertext })
    }

    /// Construction path for freshly encrypted output, which is
    /// block-aligned by construction.
    pub(crate) fn new_unchecked(iv: [u8; IV_LEN], ciphertext: Vec<u8>) -> Self {
        debug_assert!(!ciphertext.is_empty() && ciphertext.len() % BLOCK_LEN == 0);
        Self { iv, ciphertext }
    }

    /// The initialisation vector.
    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// The raw ciphertext bytes.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

impl fmt::Display for CipherString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            STANDARD.encode(self.iv),
            SEGMENT_SEPARATOR,
            STANDARD.encode(&self.ciphertext)
        )
    }
}

impl FromStr for CipherString {
    type Err = CipherError;

    /// Parse a `<base64(iv)>|<base64(ciphertext)>` token.
    ///
    /// Exactly two segments are accepted; anything else, including a third
    /// segment or non-standard base64, is [`CipherError::InvalidFormat`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (iv_part, ct_part) = s
            .split_once(SEGMENT_SEPARATOR)
            .ok_or(CipherError::InvalidFormat)?;
        if ct_part.contains(SEGMENT_SEPARATOR) {
            return Err(CipherError::InvalidFormat);
        }

        let iv_bytes = STANDARD
            .decode(iv_part)
            .map_err(|_| CipherError::InvalidFormat)?;
        let iv: [u8; IV_LEN] = iv_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CipherError::InvalidIvLength(iv_bytes.len()))?;

        let ciphertext = STANDARD
            .decode(ct_part)
            .map_err(|_| CipherError::InvalidFormat)?;

        Self::from_parts(iv, ciphertext)
    }
}

impl Serialize for CipherString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CipherString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The token does not match the `<base64>|<base64>` structure.
    #[error("invalid cipher string format")]
    InvalidFormat,

    /// The decoded IV segment is not exactly [`IV_LEN`] bytes.
    #[error("invalid IV length: expected {IV_LEN} bytes, got {0}")]
    InvalidIvLength(usize),

    /// The decoded ciphertext is empty or not a multiple of [`BLOCK_LEN`].
    #[error("invalid ciphertext length: {0} bytes is not a positive multiple of {BLOCK_LEN}")]
    InvalidCiphertextLength(usize),

    /// Padding validation failed. The observable symptom of a wrong key as
    /// well as of corrupted or forged ciphertext.
    #[error("bad padding or corrupt ciphertext")]
    Unpad,

    /// The decrypted payload is not valid UTF-8.
    #[error("decrypted payload is not valid UTF-8")]
    Utf8,
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Encrypt `plaintext` under `key` with the caller-supplied IV.
///
/// Infallible: PKCS7 always pads to a whole number of blocks, so an empty
/// payload becomes one full padding block. Callers are responsible for IV
/// freshness; the engine draws one from the OS CSPRNG per call.
pub fn encrypt_raw(plaintext: &[u8], iv: &[u8; IV_LEN], key: &MasterKey) -> Vec<u8> {
    Aes256CbcEnc::new(key.as_bytes().into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt `value` under `key` using the IV embedded in the token.
///
/// # Errors
///
/// Returns [`CipherError::Unpad`] when padding validation fails after
/// decryption (wrong key, corrupted data, or a forged token).
pub fn decrypt_raw(value: &CipherString, key: &MasterKey) -> Result<Vec<u8>, CipherError> {
    Aes256CbcDec::new(key.as_bytes().into(), value.iv().into())
        .decrypt_padded_vec_mut::<Pkcs7>(value.ciphertext())
        .map_err(|_| CipherError::Unpad)
}
