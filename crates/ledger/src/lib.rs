// Path: crates/ledger/src/lib.rs
//! Concrete ledger sub-systems.
//!
//! Each module owns one slice of chain state behind the `Ledger` trait:
//! account balances, governance parameters and proposals, staking power,
//! token supply and the contract VM. Sub-systems keep their own interior
//! locks, version independently, and expose only coarse operations to the
//! executor; nothing here is aware of block orchestration beyond its own
//! hooks.
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
pub mod gov;
pub mod meta;
pub mod staking;
pub mod supply;
pub mod vm;

pub use account::AccountLedger;
pub use gov::GovLedger;
pub use meta::MemMetaStore;
pub use staking::StakingLedger;
pub use supply::SupplyLedger;
pub use vm::VmLedger;

use beatoz_api::LedgerSet;
use beatoz_types::genesis::GenesisAppState;
use beatoz_types::ChainError;
use std::sync::Arc;

/// Builds the full ledger directory from a genesis application state,
/// enforcing the genesis supply invariant: seeded balances plus bonded
/// stakes must not exceed the configured maximum total supply.
pub fn ledgers_from_genesis(genesis: &GenesisAppState) -> Result<LedgerSet, ChainError> {
    let initial = genesis.initial_supply();
    if initial > genesis.params.max_total_supply {
        return Err(ChainError::Genesis(format!(
            "initial supply {} exceeds max total supply {}",
            initial, genesis.params.max_total_supply
        )));
    }

    Ok(LedgerSet {
        account: Arc::new(AccountLedger::from_genesis(&genesis.holders)),
        gov: Arc::new(GovLedger::new(genesis.params.clone())),
        staking: Arc::new(StakingLedger::from_genesis(&genesis.validators)),
        supply: Arc::new(SupplyLedger::new(initial)),
        vm: Arc::new(VmLedger::new()),
    })
}
