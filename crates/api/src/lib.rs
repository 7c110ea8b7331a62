// Path: crates/api/src/lib.rs
//! Core traits and stable context types for the Beatoz application layer.
//!
//! This crate owns the boundaries: the ledger sub-system trait family,
//! the per-block and per-transaction execution contexts, the
//! consensus-engine request/response shapes and the meta-storage trait
//! all live here so that implementations and the orchestrator can evolve
//! independently.
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

pub mod app;
pub mod context;
pub mod ledger;
pub mod store;

pub use context::{BlockContext, GasPool, TrxContext};
pub use ledger::{AccountStore, GovStore, Lane, Ledger, LedgerSet, SharedAccount, StakingStore, SupplyStore};
pub use store::MetaStore;
