// Path: crates/ledger/src/staking.rs
//! The staking ledger: bonded stakes, voting power, unbonding, slashing.

use beatoz_api::{BlockContext, Lane, Ledger, StakingStore, TrxContext};
use beatoz_crypto::hash::sha256;
use beatoz_types::codec;
use beatoz_types::{Address, ChainError, Coin, Event, TrxError};
use beatoz_tx::TrxPayload;
use parity_scale_codec::{Decode, Encode};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

/// Stake units per unit of voting power.
pub const POWER_SCALE: u64 = 1_000_000_000;

/// One unbonding entry, released to the account balance at its height.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Unbonding {
    pub address: Address,
    pub amount: Coin,
    pub release_height: u64,
}

pub struct StakingLedger {
    stakes: RwLock<BTreeMap<Address, Coin>>,
    unbonding: RwLock<Vec<Unbonding>>,
    version: Mutex<u64>,
}

impl StakingLedger {
    pub fn new() -> Self {
        Self {
            stakes: RwLock::new(BTreeMap::new()),
            unbonding: RwLock::new(Vec::new()),
            version: Mutex::new(0),
        }
    }

    pub fn from_genesis(validators: &[beatoz_types::genesis::GenesisValidator]) -> Self {
        let ledger = Self::new();
        {
            let mut stakes = ledger.stakes.write();
            for v in validators {
                stakes.insert(v.address, v.stake.clone());
            }
        }
        ledger
    }

    pub fn stake_of(&self, addr: &Address) -> Coin {
        self.stakes.read().get(addr).cloned().unwrap_or_else(Coin::zero)
    }

    fn state_hash(&self) -> [u8; 32] {
        let stakes = self.stakes.read();
        let unbonding = self.unbonding.read();
        sha256(codec::to_bytes_canonical(&(&*stakes, &*unbonding)))
    }
}

impl Default for StakingLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn power_of_stake(stake: &Coin) -> u64 {
    stake.div_u64(POWER_SCALE).to_u64_saturating()
}

impl StakingStore for StakingLedger {
    fn power_of(&self, addr: &Address) -> u64 {
        power_of_stake(&self.stake_of(addr))
    }

    fn total_power(&self) -> u64 {
        self.stakes
            .read()
            .values()
            .map(power_of_stake)
            .fold(0u64, u64::saturating_add)
    }

    fn is_validator(&self, addr: &Address) -> bool {
        self.power_of(addr) > 0
    }
}

impl Ledger for StakingLedger {
    fn name(&self) -> &'static str {
        "staking"
    }

    fn validate_trx(&self, ctx: &TrxContext) -> Result<(), TrxError> {
        match &ctx.tx.payload {
            TrxPayload::Stake => {
                if ctx.tx.amount.is_zero() {
                    return Err(TrxError::InvalidPayload("zero stake amount".into()));
                }
                let bonded_after = self.stake_of(&ctx.tx.from).checked_add(&ctx.tx.amount);
                if bonded_after < ctx.params.min_validator_stake {
                    return Err(TrxError::InvalidPayload(format!(
                        "bonded stake {} below validator minimum {}",
                        bonded_after, ctx.params.min_validator_stake
                    )));
                }
                Ok(())
            }
            TrxPayload::Unstake { amount } => {
                if amount.is_zero() {
                    return Err(TrxError::InvalidPayload("zero unstake amount".into()));
                }
                let bonded = self.stake_of(&ctx.tx.from);
                if bonded.checked_sub(amount).is_none() {
                    return Err(TrxError::InvalidPayload(format!(
                        "unstake {} exceeds bonded {}",
                        amount, bonded
                    )));
                }
                Ok(())
            }
            other => Err(TrxError::Ledger(format!(
                "staking ledger does not own type {}",
                other.tag()
            ))),
        }
    }

    fn execute_trx(&self, ctx: &mut TrxContext) -> Result<(), TrxError> {
        match ctx.tx.payload.clone() {
            TrxPayload::Stake => {
                // Bond out of the sender's spendable balance first; the
                // debit is the only step that can fail.
                ctx.sender.write().sub_balance(&ctx.tx.amount)?;
                let mut stakes = self.stakes.write();
                let bonded = stakes.entry(ctx.tx.from).or_insert_with(Coin::zero);
                *bonded = bonded.checked_add(&ctx.tx.amount);
                ctx.emit(
                    Event::new("stake")
                        .attr("address", ctx.tx.from.to_string())
                        .attr("amount", ctx.tx.amount.to_string()),
                );
                Ok(())
            }
            TrxPayload::Unstake { amount } => {
                let release_height = ctx.height + ctx.params.unbonding_blocks;
                {
                    let mut stakes = self.stakes.write();
                    let bonded = stakes.entry(ctx.tx.from).or_insert_with(Coin::zero);
                    *bonded = bonded.checked_sub(&amount).ok_or_else(|| {
                        TrxError::InvalidPayload("unstake exceeds bonded stake".into())
                    })?;
                    if bonded.is_zero() {
                        stakes.remove(&ctx.tx.from);
                    }
                }
                self.unbonding.write().push(Unbonding {
                    address: ctx.tx.from,
                    amount: amount.clone(),
                    release_height,
                });
                ctx.emit(
                    Event::new("unstake")
                        .attr("address", ctx.tx.from.to_string())
                        .attr("amount", amount.to_string())
                        .attr("releaseHeight", release_height.to_string()),
                );
                Ok(())
            }
            other => Err(TrxError::Ledger(format!(
                "staking ledger does not own type {}",
                other.tag()
            ))),
        }
    }

    /// Slashes validators the decided header reports as byzantine, before
    /// any transaction of the block runs.
    fn begin_block(&self, bctx: &BlockContext) -> Result<Vec<Event>, ChainError> {
        let params = bctx.ledgers.gov_params().ok_or(ChainError::Hook {
            ledger: "staking",
            reason: "governance parameters unavailable".into(),
        })?;

        let mut events = Vec::new();
        let mut stakes = self.stakes.write();
        for addr in &bctx.byzantine {
            let Some(bonded) = stakes.get_mut(addr) else {
                continue;
            };
            let slashed = bonded.mul_u64(params.slash_ratio_bps).div_u64(10_000);
            *bonded = bonded.checked_sub(&slashed).unwrap_or_else(Coin::zero);
            if bonded.is_zero() {
                stakes.remove(addr);
            }
            tracing::warn!(
                target: "staking",
                event = "slash",
                address = %addr,
                amount = %slashed,
                height = bctx.height
            );
            events.push(
                Event::new("slash")
                    .attr("address", addr.to_string())
                    .attr("amount", slashed.to_string()),
            );
        }
        Ok(events)
    }

    /// Releases matured unbonding entries back to spendable balances.
    fn end_block(&self, bctx: &BlockContext) -> Result<Vec<Event>, ChainError> {
        let accounts = bctx.ledgers.accounts().ok_or(ChainError::Hook {
            ledger: "staking",
            reason: "account ledger unavailable".into(),
        })?;

        let mut events = Vec::new();
        let mut unbonding = self.unbonding.write();
        let mut kept = Vec::with_capacity(unbonding.len());
        for entry in unbonding.drain(..) {
            if entry.release_height <= bctx.height {
                accounts
                    .add_balance(&entry.address, &entry.amount, Lane::Exec)
                    .map_err(|e| ChainError::Hook {
                        ledger: "staking",
                        reason: e.to_string(),
                    })?;
                events.push(
                    Event::new("unbondingRelease")
                        .attr("address", entry.address.to_string())
                        .attr("amount", entry.amount.to_string()),
                );
            } else {
                kept.push(entry);
            }
        }
        *unbonding = kept;
        Ok(events)
    }

    fn commit(&self) -> Result<([u8; 32], u64), ChainError> {
        let mut version = self.version.lock();
        *version += 1;
        Ok((self.state_hash(), *version))
    }

    fn close(&self) -> Result<(), ChainError> {
        Ok(())
    }

    fn as_staking(&self) -> Option<&dyn StakingStore> {
        Some(self)
    }
}
