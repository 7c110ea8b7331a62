// Path: crates/ledger/src/supply.rs
//! The supply ledger: total issuance and block-reward accrual.

use beatoz_api::{BlockContext, Ledger, SupplyStore, TrxContext};
use beatoz_crypto::hash::sha256;
use beatoz_types::codec;
use beatoz_types::{Address, ChainError, Coin, Event, TrxError};
use beatoz_tx::TrxPayload;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

pub struct SupplyLedger {
    total: RwLock<Coin>,
    /// Accrued, not-yet-withdrawn rewards per address.
    rewards: RwLock<BTreeMap<Address, Coin>>,
    version: Mutex<u64>,
}

impl SupplyLedger {
    pub fn new(initial_supply: Coin) -> Self {
        Self {
            total: RwLock::new(initial_supply),
            rewards: RwLock::new(BTreeMap::new()),
            version: Mutex::new(0),
        }
    }

    fn state_hash(&self) -> [u8; 32] {
        let total = self.total.read();
        let rewards = self.rewards.read();
        sha256(codec::to_bytes_canonical(&(&*total, &*rewards)))
    }
}

impl SupplyStore for SupplyLedger {
    fn total_supply(&self) -> Coin {
        self.total.read().clone()
    }

    fn reward_of(&self, addr: &Address) -> Coin {
        self.rewards
            .read()
            .get(addr)
            .cloned()
            .unwrap_or_else(Coin::zero)
    }
}

impl Ledger for SupplyLedger {
    fn name(&self) -> &'static str {
        "supply"
    }

    fn validate_trx(&self, ctx: &TrxContext) -> Result<(), TrxError> {
        match &ctx.tx.payload {
            TrxPayload::Withdraw { req_amt } => {
                if req_amt.is_zero() {
                    return Err(TrxError::InvalidPayload("zero withdrawal".into()));
                }
                let accrued = self.reward_of(&ctx.tx.from);
                if accrued.checked_sub(req_amt).is_none() {
                    return Err(TrxError::InvalidPayload(format!(
                        "withdrawal {} exceeds accrued reward {}",
                        req_amt, accrued
                    )));
                }
                Ok(())
            }
            other => Err(TrxError::Ledger(format!(
                "supply ledger does not own type {}",
                other.tag()
            ))),
        }
    }

    fn execute_trx(&self, ctx: &mut TrxContext) -> Result<(), TrxError> {
        match ctx.tx.payload.clone() {
            TrxPayload::Withdraw { req_amt } => {
                {
                    let mut rewards = self.rewards.write();
                    let accrued = rewards.entry(ctx.tx.from).or_insert_with(Coin::zero);
                    *accrued = accrued.checked_sub(&req_amt).ok_or_else(|| {
                        TrxError::InvalidPayload("withdrawal exceeds accrued reward".into())
                    })?;
                    if accrued.is_zero() {
                        rewards.remove(&ctx.tx.from);
                    }
                }
                // Issuance was counted when the reward accrued; this only
                // moves it into the spendable balance.
                ctx.sender.write().add_balance(&req_amt);
                ctx.emit(
                    Event::new("withdraw")
                        .attr("address", ctx.tx.from.to_string())
                        .attr("amount", req_amt.to_string()),
                );
                Ok(())
            }
            other => Err(TrxError::Ledger(format!(
                "supply ledger does not own type {}",
                other.tag()
            ))),
        }
    }

    fn begin_block(&self, _bctx: &BlockContext) -> Result<Vec<Event>, ChainError> {
        Ok(Vec::new())
    }

    /// Mints the block reward to the proposer's reward account, clamped by
    /// the maximum total supply.
    fn end_block(&self, bctx: &BlockContext) -> Result<Vec<Event>, ChainError> {
        let params = bctx.ledgers.gov_params().ok_or(ChainError::Hook {
            ledger: "supply",
            reason: "governance parameters unavailable".into(),
        })?;
        if params.block_reward.is_zero() {
            return Ok(Vec::new());
        }

        let mut total = self.total.write();
        let after = total.checked_add(&params.block_reward);
        if after > params.max_total_supply {
            tracing::info!(
                target: "supply",
                event = "issuance_capped",
                height = bctx.height,
                total = %*total
            );
            return Ok(Vec::new());
        }
        *total = after;

        let mut rewards = self.rewards.write();
        let accrued = rewards.entry(bctx.proposer).or_insert_with(Coin::zero);
        *accrued = accrued.checked_add(&params.block_reward);

        Ok(vec![Event::new("issuance")
            .attr("proposer", bctx.proposer.to_string())
            .attr("amount", params.block_reward.to_string())])
    }

    fn commit(&self) -> Result<([u8; 32], u64), ChainError> {
        let mut version = self.version.lock();
        *version += 1;
        Ok((self.state_hash(), *version))
    }

    fn close(&self) -> Result<(), ChainError> {
        Ok(())
    }

    fn as_supply(&self) -> Option<&dyn SupplyStore> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_accrual_is_per_address() {
        let ledger = SupplyLedger::new(Coin::from_u64(1_000));
        assert_eq!(ledger.total_supply(), Coin::from_u64(1_000));
        assert_eq!(ledger.reward_of(&Address([1u8; 20])), Coin::zero());

        ledger
            .rewards
            .write()
            .insert(Address([1u8; 20]), Coin::from_u64(5));
        assert_eq!(ledger.reward_of(&Address([1u8; 20])), Coin::from_u64(5));
        assert_eq!(ledger.reward_of(&Address([2u8; 20])), Coin::zero());
    }
}
