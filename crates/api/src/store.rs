// Path: crates/api/src/store.rs
//! The durable meta-storage boundary.
//!
//! The orchestrator persists the committed block context here and reloads
//! it at startup. The storage engine behind the trait is out of scope;
//! only the keyed get/put contract matters to the application layer.

use beatoz_types::ChainError;

pub trait MetaStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ChainError>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), ChainError>;
}

/// Key under which the committed block context is stored.
pub const COMMITTED_BLOCK_KEY: &str = "chain/committed_block";
