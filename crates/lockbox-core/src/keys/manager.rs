//! [`KeyManager`]: thread-safe owner of the master key over a [`KeyStore`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwapOption;
use lockbox_keystore::{KeyStore, StoreError};
use tracing::{debug, warn};

use crate::crypto::KEY_LEN;
use crate::error::CryptoError;
use crate::keys::master::MasterKey;

/// Default logical entry name the master key is persisted under.
///
/// Must stay stable across runs of a deployment; renaming it strands the
/// persisted key.
pub const MASTER_KEY_ENTRY: &str = "master_key";

/// Thread-safe owner of the single master key.
///
/// The key lives in two places: durably in the [`KeyStore`] under one
/// fixed entry name, and transiently in an in-process cache. The cache
/// wraps an [`ArcSwapOption`] so that:
/// - Readers (every encrypt and decrypt call) take a lock-free snapshot
///   and keep their own `Arc<MasterKey>` for the duration of the call.
/// - [`set_key`](KeyManager::set_key) swaps the cached value in a single
///   atomic operation, so a concurrent reader observes either the old key
///   or the new one, never a torn buffer.
/// - Key changes and the read-through fill in
///   [`get_key`](KeyManager::get_key) serialise on an internal mutex, so
///   a fill racing a clear cannot put a deleted key back in the cache.
///   Cache hits never take the lock.
///
/// Store calls run under that mutex; a [`KeyStore`] implementation must
/// not call back into the manager. Cloning is cheap and shares both
/// cache and store. Independent managers share nothing unless they share
/// a store.
#[derive(Clone)]
pub struct KeyManager {
    store: Arc<dyn KeyStore>,
    cache: Arc<ArcSwapOption<MasterKey>>,
    swap_lock: Arc<Mutex<()>>,
    entry: Arc<str>,
}

impl KeyManager {
    /// Create a manager over `store` using [`MASTER_KEY_ENTRY`].
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self::with_entry_name(store, MASTER_KEY_ENTRY)
    }

    /// Create a manager that persists the key under `entry` instead of the
    /// default, for hosts that keep several profiles in one store.
    pub fn with_entry_name(store: Arc<dyn KeyStore>, entry: &str) -> Self {
        Self {
            store,
            cache: Arc::new(ArcSwapOption::empty()),
            swap_lock: Arc::new(Mutex::new(())),
            entry: Arc::from(entry),
        }
    }

    /// Return the master key, reading through to the store on first use.
    ///
    /// `Ok(None)` means no key exists in the cache or the store; that is a
    /// normal state (locked, or never initialised), not an error. Repeated
    /// calls after a hit are lock-free cache reads with no side effects. A
    /// cache miss reads through under the same internal lock as
    /// [`set_key`](KeyManager::set_key), so a fill cannot overwrite a
    /// concurrent clear.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::StorageUnavailable`] when the store read
    /// fails or the persisted entry does not hold exactly [`KEY_LEN`]
    /// bytes.
    pub fn get_key(&self) -> Result<Option<Arc<MasterKey>>, CryptoError> {
        if let Some(key) = self.cache.load_full() {
            return Ok(Some(key));
        }

        // Miss: read through under the swap lock, re-checking the cache
        // once it is held. A fill outside the lock could race a clear
        // that runs between the store read and the cache write, and the
        // deleted key would reappear in the cache.
        let _guard = self.swap_guard();
        if let Some(key) = self.cache.load_full() {
            return Ok(Some(key));
        }

        let bytes = match self.store.retrieve(&self.entry)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let key = match MasterKey::from_slice(&bytes) {
            Ok(key) => Arc::new(key),
            Err(_) => {
                warn!(
                    entry = %self.entry,
                    len = bytes.len(),
                    "persisted master key has unexpected length"
                );
                return Err(StoreError::MalformedEntry {
                    name: self.entry.to_string(),
                    reason: format!("expected {KEY_LEN} bytes, got {}", bytes.len()),
                }
                .into());
            }
        };

        self.cache.store(Some(key.clone()));
        debug!(entry = %self.entry, "master key loaded from store");
        Ok(Some(key))
    }

    /// Replace or clear the master key.
    ///
    /// `Some(key)` persists the key and then swaps it into the cache, so a
    /// subsequent [`get_key`](KeyManager::get_key) returns exactly these
    /// bytes. `None` deletes the persisted entry and evicts the cache
    /// (lock / log-out). The store write always happens first; if it
    /// fails, the cache is left untouched. Calls serialise with each
    /// other and with the read-through fill, so cache and store never
    /// diverge.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::StorageUnavailable`] when the store write or
    /// delete fails.
    pub fn set_key(&self, key: Option<MasterKey>) -> Result<(), CryptoError> {
        let _guard = self.swap_guard();
        match key {
            Some(key) => {
                self.store.store(&self.entry, key.as_bytes())?;
                self.cache.store(Some(Arc::new(key)));
                debug!(entry = %self.entry, "master key replaced");
            }
            None => {
                self.store.delete(&self.entry)?;
                self.cache.store(None);
                debug!(entry = %self.entry, "master key cleared");
            }
        }
        Ok(())
    }

    /// Base64 encoding of the master key, or `None` when no key exists.
    ///
    /// # Errors
    ///
    /// Same conditions as [`get_key`](KeyManager::get_key).
    pub fn get_key_base64(&self) -> Result<Option<String>, CryptoError> {
        Ok(self.get_key()?.map(|key| key.to_base64()))
    }

    /// Whether a master key is currently available, cached or persisted.
    ///
    /// # Errors
    ///
    /// Same conditions as [`get_key`](KeyManager::get_key).
    pub fn has_key(&self) -> Result<bool, CryptoError> {
        Ok(self.get_key()?.is_some())
    }

    /// Take the swap lock. A poisoned mutex is taken anyway; it orders
    /// store and cache writes and holds no data of its own.
    fn swap_guard(&self) -> MutexGuard<'_, ()> {
        self.swap_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material stays out of debug output; report state only.
        f.debug_struct("KeyManager")
            .field("entry", &self.entry)
            .field("cached", &self.cache.load().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use lockbox_keystore::MemoryKeyStore;
    use mockall::mock;

    mock! {
        Store {}
        impl KeyStore for Store {
            fn retrieve(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError>;
            fn store(&self, name: &str, value: &[u8]) -> Result<(), StoreError>;
            fn delete(&self, name: &str) -> Result<(), StoreError>;
        }
    }

    fn manager_over_memory() -> (Arc<MemoryKeyStore>, KeyManager) {
        let store = Arc::new(MemoryKeyStore::new());
        let manager = KeyManager::new(store.clone());
        (store, manager)
    }

    #[test]
    fn initially_no_key() {
        let (_store, manager) = manager_over_memory();
        assert!(manager.get_key().unwrap().is_none());
        assert!(!manager.has_key().unwrap());
        assert!(manager.get_key_base64().unwrap().is_none());
    }

    #[test]
    fn set_then_get_returns_exact_bytes() {
        let (_store, manager) = manager_over_memory();
        manager.set_key(Some(MasterKey::new([0x42u8; KEY_LEN]))).unwrap();
        let key = manager.get_key().unwrap().unwrap();
        assert_eq!(key.as_bytes(), &[0x42u8; KEY_LEN]);
        assert!(manager.has_key().unwrap());
    }

    #[test]
    fn set_key_persists_to_store() {
        let (store, manager) = manager_over_memory();
        manager.set_key(Some(MasterKey::new([0x07u8; KEY_LEN]))).unwrap();
        let raw = store.retrieve(MASTER_KEY_ENTRY).unwrap().unwrap();
        assert_eq!(raw, [0x07u8; KEY_LEN]);
    }

    #[test]
    fn get_key_lazily_loads_persisted_key() {
        let store = Arc::new(MemoryKeyStore::new());
        store.store(MASTER_KEY_ENTRY, &[0x11u8; KEY_LEN]).unwrap();

        // A brand-new manager has an empty cache and must read through.
        let manager = KeyManager::new(store);
        let key = manager.get_key().unwrap().unwrap();
        assert_eq!(key.as_bytes(), &[0x11u8; KEY_LEN]);
    }

    #[test]
    fn cache_serves_reads_after_first_load() {
        let (store, manager) = manager_over_memory();
        manager.set_key(Some(MasterKey::new([0x22u8; KEY_LEN]))).unwrap();

        // Removing the persisted entry behind the manager's back does not
        // affect reads; the cache is authoritative until cleared.
        store.delete(MASTER_KEY_ENTRY).unwrap();
        assert!(manager.get_key().unwrap().is_some());
    }

    #[test]
    fn replacing_key_updates_cache_and_store() {
        let (store, manager) = manager_over_memory();
        manager.set_key(Some(MasterKey::new([0x01u8; KEY_LEN]))).unwrap();
        manager.set_key(Some(MasterKey::new([0x02u8; KEY_LEN]))).unwrap();

        assert_eq!(manager.get_key().unwrap().unwrap().as_bytes(), &[0x02u8; KEY_LEN]);
        assert_eq!(store.retrieve(MASTER_KEY_ENTRY).unwrap().unwrap(), [0x02u8; KEY_LEN]);
    }

    #[test]
    fn clearing_key_removes_cache_and_store_entry() {
        let (store, manager) = manager_over_memory();
        manager.set_key(Some(MasterKey::new([0x33u8; KEY_LEN]))).unwrap();
        manager.set_key(None).unwrap();

        assert!(manager.get_key().unwrap().is_none());
        assert!(store.retrieve(MASTER_KEY_ENTRY).unwrap().is_none());

        // A second manager over the same store confirms the entry is gone.
        let fresh = KeyManager::new(store);
        assert!(fresh.get_key().unwrap().is_none());
    }

    #[test]
    fn clearing_an_absent_key_succeeds() {
        let (_store, manager) = manager_over_memory();
        manager.set_key(None).unwrap();
        assert!(!manager.has_key().unwrap());
    }

    #[test]
    fn custom_entry_name_is_used_for_persistence() {
        let store = Arc::new(MemoryKeyStore::new());
        let manager = KeyManager::with_entry_name(store.clone(), "profile2.master");
        manager.set_key(Some(MasterKey::new([0x55u8; KEY_LEN]))).unwrap();

        assert!(store.retrieve("profile2.master").unwrap().is_some());
        assert!(store.retrieve(MASTER_KEY_ENTRY).unwrap().is_none());
    }

    #[test]
    fn get_key_base64_encodes_the_key() {
        let (_store, manager) = manager_over_memory();
        let key = MasterKey::new([0u8; KEY_LEN]);
        let expected = key.to_base64();
        manager.set_key(Some(key)).unwrap();
        assert_eq!(manager.get_key_base64().unwrap().unwrap(), expected);
    }

    #[test]
    fn malformed_persisted_key_is_a_storage_error() {
        let store = Arc::new(MemoryKeyStore::new());
        store.store(MASTER_KEY_ENTRY, &[1, 2, 3]).unwrap();

        let manager = KeyManager::new(store);
        let err = manager.get_key().unwrap_err();
        assert!(matches!(
            err,
            CryptoError::StorageUnavailable(StoreError::MalformedEntry { .. })
        ));
    }

    #[test]
    fn store_read_failure_surfaces_as_storage_unavailable() {
        let mut mock = MockStore::new();
        mock.expect_retrieve()
            .returning(|_| Err(StoreError::Backend("keychain offline".to_string())));

        let manager = KeyManager::new(Arc::new(mock));
        assert!(matches!(
            manager.get_key().unwrap_err(),
            CryptoError::StorageUnavailable(_)
        ));
    }

    #[test]
    fn failed_persist_leaves_no_phantom_key() {
        let mut mock = MockStore::new();
        mock.expect_store()
            .returning(|_, _| Err(StoreError::Backend("write refused".to_string())));
        mock.expect_retrieve().returning(|_| Ok(None));

        let manager = KeyManager::new(Arc::new(mock));
        assert!(manager.set_key(Some(MasterKey::new([9u8; KEY_LEN]))).is_err());

        // The cache was not updated, so the key is not visible.
        assert!(manager.get_key().unwrap().is_none());
    }

    #[test]
    fn failed_delete_keeps_cached_key() {
        let mut mock = MockStore::new();
        mock.expect_store().returning(|_, _| Ok(()));
        mock.expect_delete()
            .returning(|_| Err(StoreError::Backend("delete refused".to_string())));

        let manager = KeyManager::new(Arc::new(mock));
        manager.set_key(Some(MasterKey::new([8u8; KEY_LEN]))).unwrap();
        assert!(manager.set_key(None).is_err());

        // The persisted entry may still exist, so the cache stays in step.
        assert!(manager.has_key().unwrap());
    }

    #[test]
    fn concurrent_readers_never_observe_a_torn_key() {
        let (_store, manager) = manager_over_memory();
        manager.set_key(Some(MasterKey::new([0x01u8; KEY_LEN]))).unwrap();

        std::thread::scope(|s| {
            for _ in 0..4 {
                let reader = manager.clone();
                s.spawn(move || {
                    for _ in 0..1_000 {
                        let key = reader.get_key().unwrap().unwrap();
                        let bytes = key.as_bytes();
                        assert!(
                            bytes == &[0x01u8; KEY_LEN] || bytes == &[0x02u8; KEY_LEN],
                            "observed mixed key bytes"
                        );
                    }
                });
            }

            for i in 0..200 {
                let fill = if i % 2 == 0 { 0x02u8 } else { 0x01u8 };
                manager.set_key(Some(MasterKey::new([fill; KEY_LEN]))).unwrap();
            }
        });
    }

    #[test]
    fn cleared_key_stays_cleared_during_concurrent_reads() {
        let (_store, manager) = manager_over_memory();
        let stop = AtomicBool::new(false);

        std::thread::scope(|s| {
            for _ in 0..4 {
                let reader = manager.clone();
                let stop = &stop;
                s.spawn(move || {
                    // Miss-path reads race the clears below.
                    while !stop.load(Ordering::Relaxed) {
                        let _ = reader.get_key().unwrap();
                    }
                });
            }

            for _ in 0..200 {
                manager.set_key(Some(MasterKey::new([0x5Au8; KEY_LEN]))).unwrap();
                manager.set_key(None).unwrap();
                // A fill that raced the clear must not have put the
                // deleted key back in the cache.
                assert!(!manager.has_key().unwrap());
            }
            stop.store(true, Ordering::Relaxed);
        });
    }

    #[test]
    fn debug_output_contains_no_key_material() {
        let (_store, manager) = manager_over_memory();
        manager.set_key(Some(MasterKey::new([0xAAu8; KEY_LEN]))).unwrap();
        assert_eq!(
            format!("{manager:?}"),
            r#"KeyManager { entry: "master_key", cached: true }"#
        );
    }
}
