//! Master-key lifecycle: derive or import, persist, cache, replace, clear.
//!
//! # Lifecycle
//!
//! 1. At unlock, the host stretches the user's password into a key with
//!    [`crate::kdf::derive_key`] (or obtains raw key bytes from its own
//!    sync layer) and hands it to [`KeyManager::set_key`].
//! 2. The key is persisted in the configured
//!    [`KeyStore`](lockbox_keystore::KeyStore) under one fixed entry name
//!    and swapped into the in-process cache.
//! 3. Encrypt and decrypt calls snapshot the cached key via
//!    [`KeyManager::get_key`], which reads through to the store on the
//!    first call after a restart.
//! 4. Lock or log-out calls [`KeyManager::set_key`] with `None`: the
//!    persisted entry is deleted and the cache evicted in one step.
//!
//! # Security invariants
//!
//! - Key bytes are never written anywhere except the configured store
//!   entry, never logged, and zeroed when their buffers drop.
//! - Cache and store move together: the persisted entry is written or
//!   deleted before the cache is touched, and a failed store operation
//!   leaves the cache exactly as it was.

pub mod manager;
pub mod master;

pub use manager::{KeyManager, MASTER_KEY_ENTRY};
pub use master::MasterKey;
