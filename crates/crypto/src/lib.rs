// Path: crates/crypto/src/lib.rs
//! Cryptographic primitives for the Beatoz application layer: secp256k1
//! keypairs, recoverable ECDSA signatures and the hash functions the rest
//! of the workspace builds on.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo
    )
)]

pub mod error;
pub mod hash;
pub mod sign;

pub use error::CryptoError;
pub use sign::{PrivateKey, PublicKey, RecoverableSig, SIG_LEN};
