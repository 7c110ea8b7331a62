// Path: crates/types/src/lib.rs
//! Core data structures shared by every Beatoz application-layer crate.
//!
//! This crate is the stable base of the workspace: addresses, coins,
//! accounts, governance parameters, events, genesis state, the error
//! taxonomy and the canonical binary codec all live here so that higher
//! crates agree on one representation of consensus-critical data.
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

pub mod account;
pub mod address;
pub mod codec;
pub mod coin;
pub mod error;
pub mod event;
pub mod genesis;
pub mod gov;
pub mod json;

pub use account::Account;
pub use address::Address;
pub use coin::Coin;
pub use error::{ChainError, TrxError};
pub use event::Event;
pub use gov::GovParams;
