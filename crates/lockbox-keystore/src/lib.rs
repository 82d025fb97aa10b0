//! Key-store contract and reference backends for the lockbox subsystem.
//!
//! `lockbox-core` talks to persistent storage exclusively through the
//! [`KeyStore`] trait defined here. Production deployments implement the
//! trait over a platform facility (OS keychain, TPM-backed store, secrets
//! manager); the two backends in this crate exist for tests, development,
//! and headless environments where no such facility is available.

pub mod error;
pub mod file;
pub mod memory;
pub mod store;

pub use error::StoreError;
pub use file::FileKeyStore;
pub use memory::MemoryKeyStore;
pub use store::KeyStore;
