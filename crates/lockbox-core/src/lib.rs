//! Local symmetric-crypto core for client applications that keep user
//! secrets under a single master key.
//!
//! Typical wiring, in order:
//!
//! 1. Load [`Config`] and, for hosts without their own subscriber,
//!    initialise [`telemetry`].
//! 2. Construct a [`lockbox_keystore::KeyStore`] backend (platform-backed
//!    in production, [`lockbox_keystore::MemoryKeyStore`] in tests) and a
//!    [`KeyManager`] over it.
//! 3. At unlock, stretch the password with [`kdf::derive_key`] and hand
//!    the result to [`KeyManager::set_key`]; check later password entries
//!    with [`kdf::hash_password`].
//! 4. Encrypt and decrypt through a [`CipherEngine`]; persist the
//!    [`CipherString`] tokens it produces wherever the host keeps its
//!    data.

pub mod config;
pub mod crypto;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod telemetry;

pub use config::Config;
pub use crypto::{CipherEngine, CipherString, Decryption, DECRYPT_FAILED_SENTINEL};
pub use error::CryptoError;
pub use keys::{KeyManager, MasterKey};
