// Path: crates/tx/src/lib.rs
//! The Beatoz transaction model: the versioned transaction structure, its
//! closed payload union, the two wire encodings (recursive length-prefixed
//! for signing and relay, canonical SCALE for persistence and RPC) and the
//! two historical signer variants.
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

pub mod payload;
pub mod sign;
pub mod trx;

pub use payload::TrxPayload;
pub use sign::{SignRole, SignerVariant};
pub use trx::Trx;
