//! Symmetric encryption: the cipher-string format, AES-256-CBC primitives,
//! and the key-checked engine.
//!
//! # Cipher string format
//!
//! ```text
//! <base64(iv)>|<base64(ciphertext)>
//! ```
//!
//! Standard padded base64 on both segments, a 16-byte IV, and ciphertext
//! that is a positive multiple of 16 bytes. The token is self-describing:
//! decryption needs nothing beyond the token and the master key.
//!
//! [`cipher`] is storage-free; key and IV arrive as arguments. Only
//! [`engine`] consults the key manager.

pub mod cipher;
pub mod engine;

pub use cipher::{CipherError, CipherString, BLOCK_LEN, IV_LEN, KEY_LEN, SEGMENT_SEPARATOR};
pub use engine::{CipherEngine, Decryption, DECRYPT_FAILED_SENTINEL};
