// Path: crates/ledger/src/account.rs
//! The account ledger: balances, nonces, names, document URLs.
//!
//! State lives in three layers. `committed` is the last persisted state,
//! iterated in address order for the commit hash. The two lanes are
//! overlay maps of shared handles: `Exec` is mutated by block execution
//! and folded into `committed` at commit; `Check` is the mempool
//! simulation lane, thrown away and lazily rebuilt after every commit.
//!
//! `find_or_new` goes through the lane map's entry API, so N concurrent
//! resolvers of one address always get the same `Arc` — duplicate creation
//! under concurrency would give two transactions divergent copies of one
//! account, which is a consensus bug, not a performance bug.

use beatoz_api::{AccountStore, BlockContext, Lane, Ledger, SharedAccount, TrxContext};
use beatoz_crypto::hash::sha256;
use beatoz_types::codec;
use beatoz_types::{Account, Address, ChainError, Coin, Event, TrxError};
use beatoz_tx::TrxPayload;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Longest accepted account name / document URL, in bytes.
const MAX_NAME_LEN: usize = 64;
const MAX_URL_LEN: usize = 1024;

pub struct AccountLedger {
    committed: RwLock<BTreeMap<Address, Account>>,
    exec: DashMap<Address, SharedAccount>,
    check: DashMap<Address, SharedAccount>,
    version: Mutex<u64>,
}

impl AccountLedger {
    pub fn new() -> Self {
        Self {
            committed: RwLock::new(BTreeMap::new()),
            exec: DashMap::new(),
            check: DashMap::new(),
            version: Mutex::new(0),
        }
    }

    pub fn from_genesis(holders: &[beatoz_types::genesis::GenesisHolder]) -> Self {
        let ledger = Self::new();
        {
            let mut committed = ledger.committed.write();
            for h in holders {
                let mut acct = Account::with_balance(h.address, h.balance.clone());
                acct.name = h.name.clone();
                committed.insert(h.address, acct);
            }
        }
        ledger
    }

    fn lane_map(&self, lane: Lane) -> &DashMap<Address, SharedAccount> {
        match lane {
            Lane::Exec => &self.exec,
            Lane::Check => &self.check,
        }
    }

    /// The state hash over the committed map, in address order.
    fn state_hash(&self) -> [u8; 32] {
        sha256(codec::to_bytes_canonical(&*self.committed.read()))
    }
}

impl Default for AccountLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for AccountLedger {
    fn find_account(&self, addr: &Address, lane: Lane) -> Option<SharedAccount> {
        let map = self.lane_map(lane);
        if let Some(acct) = map.get(addr) {
            return Some(acct.clone());
        }
        // Known on the committed state: materialize a lane handle. The
        // entry API keeps this idempotent under concurrent callers.
        let snapshot = self.committed.read().get(addr).cloned()?;
        Some(
            map.entry(*addr)
                .or_insert_with(|| Arc::new(RwLock::new(snapshot)))
                .clone(),
        )
    }

    fn find_or_new(&self, addr: &Address, lane: Lane) -> SharedAccount {
        if let Some(existing) = self.find_account(addr, lane) {
            return existing;
        }
        self.lane_map(lane)
            .entry(*addr)
            .or_insert_with(|| Arc::new(RwLock::new(Account::new(*addr))))
            .clone()
    }

    fn set_account(&self, acct: &SharedAccount, lane: Lane) {
        let addr = acct.read().address;
        self.lane_map(lane).insert(addr, acct.clone());
    }

    fn add_balance(&self, addr: &Address, amt: &Coin, lane: Lane) -> Result<(), TrxError> {
        self.find_or_new(addr, lane).write().add_balance(amt);
        Ok(())
    }

    fn sub_balance(&self, addr: &Address, amt: &Coin, lane: Lane) -> Result<(), TrxError> {
        let acct = self
            .find_account(addr, lane)
            .ok_or_else(|| TrxError::Ledger(format!("account {} not found", addr)))?;
        let result = acct.write().sub_balance(amt);
        result
    }

    fn transfer(
        &self,
        from: &Address,
        to: &Address,
        amt: &Coin,
        lane: Lane,
    ) -> Result<(), TrxError> {
        if from == to {
            // Still must be affordable; the net movement is zero.
            let acct = self
                .find_account(from, lane)
                .ok_or_else(|| TrxError::Ledger(format!("account {} not found", from)))?;
            let guard = acct.read();
            if !guard.can_afford(amt) {
                return Err(TrxError::InsufficientFund {
                    address: *from,
                    needed: amt.clone(),
                    available: guard.balance.clone(),
                });
            }
            return Ok(());
        }
        self.sub_balance(from, amt, lane)?;
        self.add_balance(to, amt, lane)
    }

    fn committed_account(&self, addr: &Address) -> Option<Account> {
        self.committed.read().get(addr).cloned()
    }
}

impl Ledger for AccountLedger {
    fn name(&self) -> &'static str {
        "account"
    }

    fn validate_trx(&self, ctx: &TrxContext) -> Result<(), TrxError> {
        match &ctx.tx.payload {
            TrxPayload::Transfer => Ok(()),
            TrxPayload::SetDoc { name, url } => {
                if name.len() > MAX_NAME_LEN {
                    return Err(TrxError::InvalidPayload(format!(
                        "name exceeds {} bytes",
                        MAX_NAME_LEN
                    )));
                }
                if url.is_empty() || url.len() > MAX_URL_LEN {
                    return Err(TrxError::InvalidPayload(format!(
                        "url must be 1..={} bytes",
                        MAX_URL_LEN
                    )));
                }
                Ok(())
            }
            other => Err(TrxError::Ledger(format!(
                "account ledger does not own type {}",
                other.tag()
            ))),
        }
    }

    fn execute_trx(&self, ctx: &mut TrxContext) -> Result<(), TrxError> {
        match ctx.tx.payload.clone() {
            TrxPayload::Transfer => {
                if Arc::ptr_eq(&ctx.sender, &ctx.receiver) {
                    let guard = ctx.sender.read();
                    if !guard.can_afford(&ctx.tx.amount) {
                        return Err(TrxError::InsufficientFund {
                            address: guard.address,
                            needed: ctx.tx.amount.clone(),
                            available: guard.balance.clone(),
                        });
                    }
                } else {
                    ctx.sender.write().sub_balance(&ctx.tx.amount)?;
                    ctx.receiver.write().add_balance(&ctx.tx.amount);
                }
                let ev = Event::new("transfer")
                    .attr("from", ctx.tx.from.to_string())
                    .attr("to", ctx.tx.to.to_string())
                    .attr("amount", ctx.tx.amount.to_string());
                ctx.emit(ev);
                Ok(())
            }
            TrxPayload::SetDoc { name, url } => {
                {
                    let mut sender = ctx.sender.write();
                    sender.name = name;
                    sender.doc_url = Some(url);
                }
                ctx.emit(Event::new("setDoc").attr("address", ctx.tx.from.to_string()));
                Ok(())
            }
            other => Err(TrxError::Ledger(format!(
                "account ledger does not own type {}",
                other.tag()
            ))),
        }
    }

    fn begin_block(&self, _bctx: &BlockContext) -> Result<Vec<Event>, ChainError> {
        Ok(Vec::new())
    }

    fn end_block(&self, _bctx: &BlockContext) -> Result<Vec<Event>, ChainError> {
        Ok(Vec::new())
    }

    fn commit(&self) -> Result<([u8; 32], u64), ChainError> {
        // Collect exec-lane snapshots before taking the committed lock so
        // the two lock families are never held at once.
        let dirty: Vec<(Address, Account)> = self
            .exec
            .iter()
            .map(|e| (*e.key(), e.value().read().clone()))
            .collect();

        {
            let mut committed = self.committed.write();
            for (addr, acct) in dirty {
                committed.insert(addr, acct);
            }
        }
        self.exec.clear();
        // The mempool lane is stale relative to the new committed state;
        // recheck traffic repopulates it lazily.
        self.check.clear();

        let mut version = self.version.lock();
        *version += 1;
        Ok((self.state_hash(), *version))
    }

    fn close(&self) -> Result<(), ChainError> {
        Ok(())
    }

    fn as_accounts(&self) -> Option<&dyn AccountStore> {
        Some(self)
    }
}
