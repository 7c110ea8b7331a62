// Path: crates/execution/src/lib.rs
//! The Beatoz transaction-execution pipeline and block-lifecycle
//! orchestrator.
//!
//! The pipeline splits per-transaction work into two phases with very
//! different rules. Preparation (decode, signature verification, account
//! resolution) is order-independent and runs on a fixed worker pool; it
//! only reads ledger state, apart from idempotent account creation.
//! Execution (balance and nonce mutation, gas and fee accounting) is
//! order-dependent and runs strictly single-threaded per block — this is
//! the sole mechanism that keeps replicas byte-identical despite parallel
//! preparation.
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
pub mod exec;
pub mod gas;
pub mod prepare;

pub use app::BeatozApp;
pub use prepare::ParallelPreparer;
