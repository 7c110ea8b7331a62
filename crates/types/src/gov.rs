// Path: crates/types/src/gov.rs
//! Governance-controlled chain parameters.

use crate::coin::Coin;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The parameter set owned by the governance ledger and consumed by the
/// executor on every transaction.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovParams {
    /// The only gas price transactions may declare.
    pub gas_price: Coin,
    #[serde(with = "crate::json::u64_string")]
    pub min_trx_gas: u64,
    #[serde(with = "crate::json::u64_string")]
    pub max_trx_gas: u64,
    /// Initial block gas limit; the adaptive controller moves the live
    /// limit between the min/max caps below.
    #[serde(with = "crate::json::u64_string")]
    pub block_gas_limit: u64,
    #[serde(with = "crate::json::u64_string")]
    pub min_block_gas_limit: u64,
    #[serde(with = "crate::json::u64_string")]
    pub max_block_gas_limit: u64,
    /// Hard cap on circulating supply, checked at genesis and by issuance.
    pub max_total_supply: Coin,
    /// Reward minted to the proposer's reward account each block.
    pub block_reward: Coin,
    /// Default voting window length for proposals, in blocks.
    #[serde(with = "crate::json::u64_string")]
    pub voting_blocks: u64,
    /// Minimum self-stake for validator rights.
    pub min_validator_stake: Coin,
    /// Unbonding delay applied to unstake requests, in blocks.
    #[serde(with = "crate::json::u64_string")]
    pub unbonding_blocks: u64,
    /// Slash ratio applied to byzantine validators, in basis points.
    #[serde(with = "crate::json::u64_string")]
    pub slash_ratio_bps: u64,
}

impl Default for GovParams {
    fn default() -> Self {
        Self {
            gas_price: Coin::from_u64(10),
            min_trx_gas: 4_000,
            max_trx_gas: 25_000_000,
            block_gas_limit: 36_000_000,
            min_block_gas_limit: 1_000_000,
            max_block_gas_limit: 500_000_000,
            max_total_supply: Coin::from_u64(700_000_000).mul_u64(1_000_000_000),
            block_reward: Coin::from_u64(1_000_000),
            voting_blocks: 518_400,
            min_validator_stake: Coin::from_u64(7_000_000).mul_u64(1_000_000_000),
            unbonding_blocks: 518_400,
            slash_ratio_bps: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_keeps_precision() {
        let p = GovParams::default();
        let js = serde_json::to_string(&p).unwrap();
        let back: GovParams = serde_json::from_str(&js).unwrap();
        assert_eq!(back, p);
        assert!(js.contains("\"maxTrxGas\":\"25000000\""));
    }
}
