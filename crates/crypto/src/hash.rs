// Path: crates/crypto/src/hash.rs
//! Hash functions used across the workspace.

use sha2::{Digest as Sha2Digest, Sha256};
use sha3::{Digest as Sha3Digest, Keccak256};

/// SHA-256: transaction hashes, ledger commit hashes, the aggregate
/// application hash.
pub fn sha256(data: impl AsRef<[u8]>) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(data.as_ref());
    h.finalize().into()
}

/// SHA-256 over a sequence of already-separated parts.
pub fn sha256_concat<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> [u8; 32] {
    let mut h = Sha256::new();
    for p in parts {
        h.update(p);
    }
    h.finalize().into()
}

/// Keccak-256: signing digests and address derivation.
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    let mut h = Keccak256::new();
    h.update(data.as_ref());
    h.finalize().into()
}
