// Path: crates/api/src/context.rs
//! Per-block and per-transaction execution contexts.

use crate::ledger::{Lane, LedgerSet, SharedAccount};
use beatoz_types::{Address, Coin, Event, GovParams, TrxError};
use beatoz_tx::Trx;
use parking_lot::Mutex;
use std::sync::Arc;

/// The per-block consumable gas budget.
///
/// The one piece of state mutated by multiple transactions within a block,
/// so it carries its own exclusive lock. It is only ever decremented by
/// [`GasPool::use_gas`] and incremented back by [`GasPool::refund`] with
/// the exact amount previously consumed — never below zero, never above
/// the configured limit.
pub struct GasPool {
    limit: u64,
    used: Mutex<u64>,
}

impl GasPool {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            used: Mutex::new(0),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn used(&self) -> u64 {
        *self.used.lock()
    }

    pub fn remaining(&self) -> u64 {
        self.limit - *self.used.lock()
    }

    /// Reserves `amount` from the pool.
    pub fn use_gas(&self, amount: u64) -> Result<(), TrxError> {
        let mut used = self.used.lock();
        let remaining = self.limit - *used;
        if amount > remaining {
            return Err(TrxError::BlockGasExhausted {
                requested: amount,
                remaining,
            });
        }
        *used += amount;
        Ok(())
    }

    /// Returns previously reserved gas to the pool. A refund larger than
    /// the outstanding reservation indicates a caller bug; it is clamped
    /// so the pool invariant survives.
    pub fn refund(&self, amount: u64) {
        let mut used = self.used.lock();
        if amount > *used {
            tracing::warn!(
                target: "execution",
                refund = amount,
                outstanding = *used,
                "gas refund exceeds outstanding reservation; clamping"
            );
            *used = 0;
        } else {
            *used -= amount;
        }
    }
}

/// One block's shared mutable state, created at begin-block and superseded
/// by its committed form at commit.
pub struct BlockContext {
    pub height: u64,
    /// Block time from the decided header, unix nanoseconds.
    pub time: i64,
    pub chain_id: String,
    pub proposer: Address,
    /// Validators reported byzantine in the decided header.
    pub byzantine: Vec<Address>,
    pub ledgers: Arc<LedgerSet>,
    gas_pool: Arc<GasPool>,
    fee_sum: Mutex<Coin>,
    trx_count: Mutex<u64>,
}

impl BlockContext {
    pub fn new(
        height: u64,
        time: i64,
        chain_id: String,
        proposer: Address,
        byzantine: Vec<Address>,
        gas_limit: u64,
        ledgers: Arc<LedgerSet>,
    ) -> Self {
        Self {
            height,
            time,
            chain_id,
            proposer,
            byzantine,
            ledgers,
            gas_pool: Arc::new(GasPool::new(gas_limit)),
            fee_sum: Mutex::new(Coin::zero()),
            trx_count: Mutex::new(0),
        }
    }

    pub fn gas_pool(&self) -> &Arc<GasPool> {
        &self.gas_pool
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_pool.limit()
    }

    pub fn gas_used(&self) -> u64 {
        self.gas_pool.used()
    }

    pub fn add_fee(&self, fee: &Coin) {
        let mut sum = self.fee_sum.lock();
        *sum = sum.checked_add(fee);
    }

    pub fn fee_sum(&self) -> Coin {
        self.fee_sum.lock().clone()
    }

    pub fn bump_trx_count(&self) -> u64 {
        let mut n = self.trx_count.lock();
        *n += 1;
        *n
    }

    pub fn trx_count(&self) -> u64 {
        *self.trx_count.lock()
    }
}

/// One transaction attempt's execution state.
///
/// Built by the parallel preparer, consumed exactly once by the sequential
/// executor (validate → execute → post-process), then discarded. Never
/// shared between two concurrent executions.
pub struct TrxContext {
    pub tx: Trx,
    pub tx_hash: [u8; 32],
    pub height: u64,
    pub time: i64,
    /// Resolved sender; must already exist on the ledger.
    pub sender: SharedAccount,
    /// Resolved receiver; created on demand, the zero address included.
    pub receiver: SharedAccount,
    /// Resolved distinct fee payer, when one is declared and signed.
    pub payer: Option<SharedAccount>,
    /// The lane this context runs against: `Exec` for full execution,
    /// `Check` for a non-committing admission simulation.
    pub lane: Lane,
    /// Shared handle to the block's gas pool; the contract VM draws from
    /// it directly because it must account for sub-calls.
    pub gas_pool: Arc<GasPool>,
    /// Governance parameters in force for this block, resolved once at
    /// context construction.
    pub params: GovParams,
    /// The block's ledger directory, for sub-systems that must touch a
    /// collaborator (e.g. the VM materializing a contract account).
    pub ledgers: Arc<LedgerSet>,
    /// Sender's staking power, resolved by the executor before dispatch so
    /// sub-systems can check validator rights without cross-ledger calls.
    pub sender_power: u64,
    pub gas_used: u64,
    pub return_data: Vec<u8>,
    pub events: Vec<Event>,
}

impl TrxContext {
    /// The account that pays gas x price for this transaction.
    pub fn fee_payer(&self) -> SharedAccount {
        match &self.payer {
            Some(p) => p.clone(),
            None => self.sender.clone(),
        }
    }

    /// True when full execution (not an admission simulation) is running.
    pub fn is_full_execution(&self) -> bool {
        self.lane == Lane::Exec
    }

    pub fn emit(&mut self, ev: Event) {
        self.events.push(ev);
    }
}
