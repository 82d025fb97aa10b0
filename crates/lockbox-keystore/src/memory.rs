//! In-memory key store for tests and ephemeral processes.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::store::KeyStore;

/// [`KeyStore`] backed by a process-local map.
///
/// Contents are lost when the process exits and nothing is protected at
/// rest. Suitable for tests and for short-lived tools that never need the
/// key to survive a restart.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("entry map lock poisoned".to_string()))
    }
}

impl KeyStore for MemoryKeyStore {
    fn retrieve(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.guard()?.get(name).cloned())
    }

    fn store(&self, name: &str, value: &[u8]) -> Result<(), StoreError> {
        self.guard()?.insert(name.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.guard()?.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieve_of_absent_entry_is_none() {
        let store = MemoryKeyStore::new();
        assert!(store.retrieve("missing").unwrap().is_none());
    }

    #[test]
    fn store_then_retrieve_round_trips() {
        let store = MemoryKeyStore::new();
        store.store("entry", b"payload").unwrap();
        assert_eq!(store.retrieve("entry").unwrap().unwrap(), b"payload");
    }

    #[test]
    fn store_overwrites_existing_value() {
        let store = MemoryKeyStore::new();
        store.store("entry", b"old").unwrap();
        store.store("entry", b"new").unwrap();
        assert_eq!(store.retrieve("entry").unwrap().unwrap(), b"new");
    }

    #[test]
    fn delete_removes_entry() {
        let store = MemoryKeyStore::new();
        store.store("entry", b"payload").unwrap();
        store.delete("entry").unwrap();
        assert!(store.retrieve("entry").unwrap().is_none());
    }

    #[test]
    fn delete_of_absent_entry_succeeds() {
        let store = MemoryKeyStore::new();
        store.delete("never-stored").unwrap();
    }

    #[test]
    fn entries_are_independent() {
        let store = MemoryKeyStore::new();
        store.store("a", b"1").unwrap();
        store.store("b", b"2").unwrap();
        store.delete("a").unwrap();
        assert!(store.retrieve("a").unwrap().is_none());
        assert_eq!(store.retrieve("b").unwrap().unwrap(), b"2");
    }
}
