// Path: crates/execution/src/app/mod.rs
//! `BeatozApp` — the block-lifecycle orchestrator.
//!
//! Implements the lifecycle the external consensus engine drives:
//! `info`, `init_chain` (once), then `begin_block → deliver* → end_block
//! → commit` per height, plus the non-committing admission check and a
//! generic query. One exclusion lock serializes admission checks against
//! in-progress block processing; blocks themselves are never processed
//! concurrently.
//!
//! Error discipline: per-transaction failures become result records and
//! never escape; a sub-system failure in any lifecycle hook or commit is
//! returned as a `ChainError` the surrounding process must treat as
//! fatal — there is no recovery for ledgers that have diverged.

mod query;

use crate::exec;
use crate::gas;
use crate::prepare::{build_trx_context, ParallelPreparer};
use beatoz_api::app::{
    BlockHeader, CheckKind, CommittedBlock, RequestQuery, ResponseCheckTrx, ResponseCommit,
    ResponseEndBlock, ResponseInfo, ResponseQuery, TrxResult,
};
use beatoz_api::store::COMMITTED_BLOCK_KEY;
use beatoz_api::{BlockContext, Lane, LedgerSet, MetaStore, TrxContext};
use beatoz_crypto::hash::{sha256, sha256_concat};
use beatoz_ledger::ledgers_from_genesis;
use beatoz_types::genesis::GenesisAppState;
use beatoz_types::{Address, ChainError, Event, TrxError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Callback invoked once per transaction result inside `end_block`.
pub type DeliverCallback = Box<dyn Fn(&TrxResult) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockStage {
    Began,
    Ended,
}

struct CurrentBlock {
    bctx: Arc<BlockContext>,
    stage: BlockStage,
    /// Hash of every delivered transaction, in submission order, so a
    /// preparation failure still reports which transaction it rejects.
    delivered: Vec<[u8; 32]>,
    /// Chosen at end-block by the adaptive controller.
    next_gas_limit: u64,
}

struct AppState {
    chain_id: String,
    meta: Arc<dyn MetaStore>,
    ledgers: Option<Arc<LedgerSet>>,
    committed: CommittedBlock,
    current: Option<CurrentBlock>,
    initialized: bool,
    deliver_cb: Option<DeliverCallback>,
}

pub struct BeatozApp {
    state: Mutex<AppState>,
    preparer: ParallelPreparer,
}

impl BeatozApp {
    /// Creates the application, reloading the last committed block
    /// context from meta storage when one exists.
    pub fn new(
        chain_id: impl Into<String>,
        meta: Arc<dyn MetaStore>,
        preparer_workers: usize,
    ) -> Result<Self, ChainError> {
        let chain_id = chain_id.into();
        let committed = match meta.get(COMMITTED_BLOCK_KEY)? {
            Some(raw) => serde_json::from_slice::<CommittedBlock>(&raw)
                .map_err(|e| ChainError::Store(format!("corrupt committed block: {}", e)))?,
            None => CommittedBlock::default(),
        };

        Ok(Self {
            state: Mutex::new(AppState {
                chain_id,
                meta,
                ledgers: None,
                committed,
                current: None,
                initialized: false,
                deliver_cb: None,
            }),
            preparer: ParallelPreparer::new(preparer_workers),
        })
    }

    pub fn set_deliver_callback(&self, cb: DeliverCallback) {
        self.state.lock().deliver_cb = Some(cb);
    }

    /// Reports the last committed height and aggregate state hash so the
    /// consensus engine can decide whether to replay or resume.
    pub fn info(&self) -> ResponseInfo {
        let st = self.state.lock();
        ResponseInfo {
            last_height: st.committed.height,
            last_app_hash: st.committed.app_hash.clone(),
        }
    }

    /// Seeds every ledger sub-system from the genesis application state.
    /// Invoked exactly once, at genesis.
    pub fn init_chain(&self, genesis: &GenesisAppState) -> Result<Vec<u8>, ChainError> {
        let mut st = self.state.lock();
        if st.initialized {
            return Err(ChainError::Lifecycle("init_chain called twice".into()));
        }

        let ledgers = Arc::new(ledgers_from_genesis(genesis)?);
        let (app_hash, _) = commit_ledgers(&ledgers)?;

        st.committed = CommittedBlock {
            height: 0,
            time: 0,
            chain_id: st.chain_id.clone(),
            proposer: Address::ZERO,
            app_hash: app_hash.clone(),
            gas_used: 0,
            fee_sum: beatoz_types::Coin::zero(),
            trx_count: 0,
            next_gas_limit: genesis.params.block_gas_limit,
        };
        persist_committed(&*st.meta, &st.committed)?;
        st.ledgers = Some(ledgers);
        st.initialized = true;

        tracing::info!(
            target: "app",
            event = "init_chain",
            chain_id = %st.chain_id,
            app_hash = hex::encode(&app_hash)
        );
        Ok(app_hash)
    }

    /// The non-committing admission check. Runs against the mempool lane:
    /// balance, amount and nonce movement is simulated there so dependent
    /// pool admissions behave sensibly, but the canonical ledgers never
    /// see any of it. New checks and rechecks run the same simulation.
    pub fn check_trx(&self, _kind: CheckKind, raw: &[u8]) -> ResponseCheckTrx {
        let st = self.state.lock();
        let Some(ledgers) = st.ledgers.clone() else {
            return check_rejection(&TrxError::Ledger("chain not initialized".into()));
        };

        // An ephemeral block context one height past the committed block;
        // its gas pool is private to this check.
        let bctx = BlockContext::new(
            st.committed.height + 1,
            st.committed.time,
            st.chain_id.clone(),
            Address::ZERO,
            Vec::new(),
            st.committed.next_gas_limit,
            ledgers,
        );

        match simulate_admission(raw, &bctx) {
            Ok(ctx) => ResponseCheckTrx {
                code: 0,
                log: String::new(),
                sender: Some(ctx.tx.from),
                gas_wanted: ctx.tx.gas,
            },
            Err(e) => check_rejection(&e),
        }
    }

    /// Opens the block at the decided header: constructs the new block
    /// context with the previous block's adaptive gas limit and forwards
    /// the begin hooks to every ledger sub-system in the fixed order.
    pub fn begin_block(&self, header: &BlockHeader) -> Result<Vec<Event>, ChainError> {
        let mut st = self.state.lock();
        if !st.initialized {
            return Err(ChainError::Lifecycle("begin_block before init_chain".into()));
        }
        if st.current.is_some() {
            return Err(ChainError::Lifecycle(
                "begin_block while a block is in progress".into(),
            ));
        }
        let expected = st.committed.height + 1;
        if header.height != expected {
            return Err(ChainError::HeightMismatch {
                expected,
                got: header.height,
            });
        }
        if header.chain_id != st.chain_id {
            return Err(ChainError::Lifecycle(format!(
                "header chain id '{}' does not match '{}'",
                header.chain_id, st.chain_id
            )));
        }

        let ledgers = st
            .ledgers
            .clone()
            .ok_or_else(|| ChainError::Lifecycle("ledgers missing".into()))?;
        let bctx = Arc::new(BlockContext::new(
            header.height,
            header.time,
            st.chain_id.clone(),
            header.proposer,
            header.byzantine.clone(),
            st.committed.next_gas_limit,
            ledgers.clone(),
        ));

        self.preparer.reset();

        let mut events = Vec::new();
        for ledger in ledgers.in_order() {
            events.extend(ledger.begin_block(&bctx)?);
        }

        tracing::debug!(
            target: "app",
            event = "begin_block",
            height = header.height,
            gas_limit = bctx.gas_limit()
        );

        st.current = Some(CurrentBlock {
            bctx,
            stage: BlockStage::Began,
            delivered: Vec::new(),
            next_gas_limit: st.committed.next_gas_limit,
        });
        Ok(events)
    }

    /// Enqueues one raw transaction into the parallel preparer and
    /// returns immediately; the semantically meaningful response is
    /// deferred to `end_block`.
    pub fn deliver_trx(&self, raw: Vec<u8>) -> Result<(), ChainError> {
        let mut st = self.state.lock();
        let current = st
            .current
            .as_mut()
            .filter(|c| c.stage == BlockStage::Began)
            .ok_or_else(|| ChainError::Lifecycle("deliver_trx outside a block".into()))?;

        current.delivered.push(sha256(&raw));
        let bctx = current.bctx.clone();
        self.preparer
            .add(Box::new(move || build_trx_context(&raw, &bctx, Lane::Exec)));
        Ok(())
    }

    /// Awaits the preparation barrier, drives the sequential executor
    /// over every context in original order, forwards the end hooks, and
    /// recomputes the next block's gas limit.
    pub fn end_block(&self) -> Result<ResponseEndBlock, ChainError> {
        let mut st = self.state.lock();
        let st = &mut *st;
        let current = st
            .current
            .as_mut()
            .filter(|c| c.stage == BlockStage::Began)
            .ok_or_else(|| ChainError::Lifecycle("end_block outside a block".into()))?;

        let prepared = self.preparer.wait();
        debug_assert_eq!(prepared.len(), current.delivered.len());

        let bctx = current.bctx.clone();
        let mut trx_results = Vec::with_capacity(prepared.len());
        for (i, prep) in prepared.into_iter().enumerate() {
            bctx.bump_trx_count();
            let result = match prep {
                Ok(mut ctx) => match exec::run_trx(&mut ctx, &bctx) {
                    Ok(fee) => TrxResult::ok(
                        ctx.tx_hash,
                        ctx.gas_used,
                        fee,
                        ctx.return_data,
                        ctx.events,
                    ),
                    Err(e) => TrxResult::rejected(Some(ctx.tx_hash), &e),
                },
                Err(e) => TrxResult::rejected(current.delivered.get(i).copied(), &e),
            };
            if let Some(cb) = &st.deliver_cb {
                cb(&result);
            }
            trx_results.push(result);
        }

        let mut events = Vec::new();
        for ledger in bctx.ledgers.in_order() {
            events.extend(ledger.end_block(&bctx)?);
        }

        let params = bctx
            .ledgers
            .gov_params()
            .ok_or_else(|| ChainError::Lifecycle("governance parameters missing".into()))?;
        let next_gas_limit = gas::next_block_gas_limit(
            bctx.gas_limit(),
            bctx.gas_used(),
            params.min_block_gas_limit,
            params.max_block_gas_limit,
        );

        tracing::debug!(
            target: "app",
            event = "end_block",
            height = bctx.height,
            gas_used = bctx.gas_used(),
            next_gas_limit
        );

        current.stage = BlockStage::Ended;
        current.next_gas_limit = next_gas_limit;
        Ok(ResponseEndBlock {
            trx_results,
            events,
            next_block_gas_limit: next_gas_limit,
        })
    }

    /// Asks every ledger sub-system to persist, asserts they all landed on
    /// one version, combines their hashes into the aggregate application
    /// hash, and persists the committed block context.
    pub fn commit(&self) -> Result<ResponseCommit, ChainError> {
        let mut st = self.state.lock();
        let current = st
            .current
            .take()
            .ok_or_else(|| ChainError::Lifecycle("commit outside a block".into()))?;
        if current.stage != BlockStage::Ended {
            // The half-processed block is dropped; the caller must abort.
            return Err(ChainError::Lifecycle("commit before end_block".into()));
        }

        let bctx = current.bctx;
        let (app_hash, version) = commit_ledgers(&bctx.ledgers)?;

        st.committed = CommittedBlock {
            height: bctx.height,
            time: bctx.time,
            chain_id: st.chain_id.clone(),
            proposer: bctx.proposer,
            app_hash: app_hash.clone(),
            gas_used: bctx.gas_used(),
            fee_sum: bctx.fee_sum(),
            trx_count: bctx.trx_count(),
            next_gas_limit: current.next_gas_limit,
        };
        persist_committed(&*st.meta, &st.committed)?;

        tracing::info!(
            target: "app",
            event = "commit",
            height = bctx.height,
            version,
            app_hash = hex::encode(&app_hash),
            gas_used = bctx.gas_used(),
            trxs = bctx.trx_count()
        );

        Ok(ResponseCommit {
            app_hash,
            height: bctx.height,
        })
    }

    /// Closes every ledger sub-system in the fixed order. A block in
    /// progress is abandoned; only committed state survives a restart.
    pub fn stop(&self) -> Result<(), ChainError> {
        let mut st = self.state.lock();
        st.current = None;
        if let Some(ledgers) = st.ledgers.take() {
            for ledger in ledgers.in_order() {
                ledger.close()?;
            }
        }
        st.initialized = false;
        tracing::info!(target: "app", event = "stop", height = st.committed.height);
        Ok(())
    }

    /// Generic key/value query against the committed state.
    pub fn query(&self, req: &RequestQuery) -> ResponseQuery {
        let st = self.state.lock();
        let Some(ledgers) = st.ledgers.as_ref() else {
            return ResponseQuery::error(1, "chain not initialized");
        };
        query::handle(ledgers, &st.committed, req)
    }
}

/// Commits every sub-system in the fixed order, asserts version
/// agreement, and aggregates the hashes.
fn commit_ledgers(ledgers: &LedgerSet) -> Result<(Vec<u8>, u64), ChainError> {
    let mut hashes: Vec<[u8; 32]> = Vec::with_capacity(5);
    let mut version: Option<u64> = None;

    for ledger in ledgers.in_order() {
        let (hash, v) = ledger.commit()?;
        match version {
            None => version = Some(v),
            Some(expected) if expected != v => {
                return Err(ChainError::LedgerVersionMismatch {
                    ledger: ledger.name(),
                    expected,
                    got: v,
                });
            }
            Some(_) => {}
        }
        hashes.push(hash);
    }

    let aggregate = sha256_concat(hashes.iter().map(|h| h.as_slice()));
    Ok((aggregate.to_vec(), version.unwrap_or(0)))
}

fn persist_committed(meta: &dyn MetaStore, committed: &CommittedBlock) -> Result<(), ChainError> {
    let raw = serde_json::to_vec(committed)
        .map_err(|e| ChainError::Store(format!("encode committed block: {}", e)))?;
    meta.put(COMMITTED_BLOCK_KEY, &raw)
}

fn check_rejection(err: &TrxError) -> ResponseCheckTrx {
    ResponseCheckTrx {
        code: err.code(),
        log: err.to_string(),
        sender: None,
        gas_wanted: 0,
    }
}

/// Builds a mempool-lane context and applies the admission simulation:
/// full common and type-specific validation, then the fee (plus the moved
/// amount, when the sender pays its own fee) debited and the nonce bumped
/// against the mempool view only.
fn simulate_admission(raw: &[u8], bctx: &BlockContext) -> Result<TrxContext, TrxError> {
    let ctx = build_trx_context(raw, bctx, Lane::Check)?;

    exec::validate_trx(&ctx)?;
    exec::owning_ledger(bctx, &ctx.tx.payload)
        .clone()
        .validate_trx(&ctx)?;

    let max_fee = ctx.tx.gas_price.mul_u64(ctx.tx.gas);
    match &ctx.payer {
        Some(payer) => {
            payer.write().sub_balance(&max_fee)?;
            ctx.sender.write().sub_balance(&ctx.tx.amount)?;
        }
        None => {
            let total = ctx.tx.amount.checked_add(&max_fee);
            ctx.sender.write().sub_balance(&total)?;
        }
    }
    ctx.sender.write().nonce += 1;

    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatoz_ledger::{AccountLedger, GovLedger, StakingLedger, SupplyLedger, VmLedger};
    use beatoz_types::{Coin, GovParams};

    fn empty_ledgers() -> LedgerSet {
        LedgerSet {
            account: Arc::new(AccountLedger::new()),
            gov: Arc::new(GovLedger::new(GovParams::default())),
            staking: Arc::new(StakingLedger::new()),
            supply: Arc::new(SupplyLedger::new(Coin::zero())),
            vm: Arc::new(VmLedger::new()),
        }
    }

    #[test]
    fn commit_requires_all_ledgers_on_one_version() {
        let ledgers = empty_ledgers();
        let (hash_a, v) = commit_ledgers(&ledgers).unwrap();
        assert_eq!(v, 1);

        // Same state, same aggregate.
        let (hash_b, v) = commit_ledgers(&ledgers).unwrap();
        assert_eq!(v, 2);
        assert_eq!(hash_a, hash_b);

        // One ledger slips ahead: the next aggregate commit must refuse.
        ledgers.staking.commit().unwrap();
        assert!(matches!(
            commit_ledgers(&ledgers),
            Err(ChainError::LedgerVersionMismatch { ledger: "staking", .. })
        ));
    }

    #[test]
    fn aggregate_hash_covers_every_subsystem_in_order() {
        let ledgers = empty_ledgers();
        let (base, _) = commit_ledgers(&ledgers).unwrap();

        // Divergent staking state must change the aggregate.
        let staking = StakingLedger::from_genesis(&[beatoz_types::genesis::GenesisValidator {
            address: beatoz_types::Address([1u8; 20]),
            stake: Coin::from_u64(5_000_000_000),
        }]);
        let diverged = LedgerSet {
            staking: Arc::new(staking),
            ..empty_ledgers()
        };
        let (other, _) = commit_ledgers(&diverged).unwrap();
        assert_ne!(base, other);
    }
}
