// Path: crates/types/src/genesis.rs
//! Genesis application state consumed by `init_chain`.

use crate::address::Address;
use crate::coin::Coin;
use crate::gov::GovParams;
use serde::{Deserialize, Serialize};

/// An initial asset holder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisHolder {
    pub address: Address,
    pub balance: Coin,
    #[serde(default)]
    pub name: String,
}

/// An initial validator: its operator address and self-stake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisValidator {
    pub address: Address,
    pub stake: Coin,
}

/// The complete genesis application state. Invariant, checked at
/// `init_chain`: the supply implied by holders plus validator stakes must
/// not exceed `params.max_total_supply`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisAppState {
    pub holders: Vec<GenesisHolder>,
    pub validators: Vec<GenesisValidator>,
    pub params: GovParams,
}

impl GenesisAppState {
    /// Total supply seeded at genesis: holder balances plus bonded stakes.
    pub fn initial_supply(&self) -> Coin {
        let mut total = Coin::zero();
        for h in &self.holders {
            total = total.checked_add(&h.balance);
        }
        for v in &self.validators {
            total = total.checked_add(&v.stake);
        }
        total
    }
}
