// Path: crates/ledger/src/meta.rs
//! In-memory meta storage.
//!
//! The durable engine behind the `MetaStore` trait is out of scope for the
//! application layer; this implementation backs tests and embedded runs.

use beatoz_api::MetaStore;
use beatoz_types::ChainError;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct MemMetaStore {
    inner: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemMetaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetaStore for MemMetaStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ChainError> {
        Ok(self.inner.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), ChainError> {
        self.inner.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_round_trip() {
        let store = MemMetaStore::new();
        assert!(store.get("missing").unwrap().is_none());
        store.put("k", b"v").unwrap();
        assert_eq!(store.get("k").unwrap().unwrap(), b"v");
        store.put("k", b"v2").unwrap();
        assert_eq!(store.get("k").unwrap().unwrap(), b"v2");
    }
}
