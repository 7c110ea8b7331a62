// Path: crates/execution/src/prepare.rs
//! Transaction-context construction and the parallel preparer.

use beatoz_api::{BlockContext, Lane, TrxContext};
use beatoz_tx::{sign, Trx};
use beatoz_types::TrxError;
use crossbeam_channel::{unbounded, Sender};
use crossbeam_utils::sync::WaitGroup;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Builds one transaction's execution context against a block.
///
/// Decode → policy checks → signature verification → account resolution.
/// Pure with respect to already-resolved inputs and safe to run
/// concurrently across independent transactions: the only ledger write it
/// can trigger is the idempotent creation of a missing receiver (or, in
/// the mempool lane, a missing payer view), which the account ledger keeps
/// race-free.
pub fn build_trx_context(
    raw: &[u8],
    bctx: &BlockContext,
    lane: Lane,
) -> Result<TrxContext, TrxError> {
    let tx = Trx::decode_wire(raw)?;
    let tx_hash = tx.hash();

    let params = bctx
        .ledgers
        .gov_params()
        .ok_or_else(|| TrxError::Ledger("governance parameters unavailable".into()))?;

    if tx.gas_price != params.gas_price {
        return Err(TrxError::InvalidGasPrice {
            declared: tx.gas_price.clone(),
            required: params.gas_price.clone(),
        });
    }
    if tx.gas < params.min_trx_gas || tx.gas > params.max_trx_gas {
        return Err(TrxError::GasOutOfBounds {
            gas: tx.gas,
            min: params.min_trx_gas,
            max: params.max_trx_gas,
        });
    }

    sign::verify_trx(&tx, &bctx.chain_id)?;
    sign::verify_payer(&tx, &bctx.chain_id)?;

    let accounts = bctx
        .ledgers
        .accounts()
        .ok_or_else(|| TrxError::Ledger("account ledger unavailable".into()))?;

    // The sender must already exist; the receiver is created on demand,
    // the zero (contract-creation) address included.
    let sender = accounts
        .find_account(&tx.from, lane)
        .ok_or(TrxError::UnknownSender(tx.from))?;
    let receiver = accounts.find_or_new(&tx.to, lane);
    let payer = if tx.has_payer() {
        Some(
            accounts
                .find_account(&tx.payer, lane)
                .ok_or(TrxError::UnknownSender(tx.payer))?,
        )
    } else {
        None
    };

    let sender_power = bctx
        .ledgers
        .staking()
        .map(|s| s.power_of(&tx.from))
        .unwrap_or(0);

    Ok(TrxContext {
        height: bctx.height,
        time: bctx.time,
        tx,
        tx_hash,
        sender,
        receiver,
        payer,
        lane,
        gas_pool: bctx.gas_pool().clone(),
        params,
        ledgers: bctx.ledgers.clone(),
        sender_power,
        gas_used: 0,
        return_data: Vec::new(),
        events: Vec::new(),
    })
}

/// The result slot of one prepared transaction: a ready-to-execute
/// context, or the captured failure that will become that transaction's
/// outcome.
pub type PrepResult = Result<TrxContext, TrxError>;

/// Work handed to a preparer worker.
pub type PrepareFn = Box<dyn FnOnce() -> PrepResult + Send + 'static>;

struct Job {
    index: usize,
    prepare: PrepareFn,
    guard: WaitGroup,
}

struct Batch {
    count: usize,
    wg: WaitGroup,
}

/// A fixed pool of long-lived worker tasks turning raw transactions into
/// [`TrxContext`]s without serializing on the expensive decode/verify/
/// lookup work.
///
/// Work item `i` goes to worker `i % workers` over that worker's own
/// queue, so result slots stay independent of scheduling order and each
/// queue's depth is bounded by the batch it serves. A [`WaitGroup`]
/// barrier — not a shared counter — gates [`ParallelPreparer::wait`]:
/// every enqueued item holds a clone of the group and drops it when its
/// slot is filled, so the barrier releases exactly when all N slots are
/// occupied, failed preparations included. A preparation failure is a
/// terminal negative result for its slot, never a crash and never a hole
/// the barrier could hang on.
pub struct ParallelPreparer {
    queues: Vec<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    results: Arc<DashMap<usize, PrepResult>>,
    batch: Mutex<Batch>,
}

impl ParallelPreparer {
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let results: Arc<DashMap<usize, PrepResult>> = Arc::new(DashMap::new());

        let mut queues = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let (tx_job, rx_job) = unbounded::<Job>();
            let results = results.clone();
            let handle = std::thread::Builder::new()
                .name(format!("trx-preparer-{}", id))
                .spawn(move || {
                    // Lives until the owning preparer drops its sender.
                    while let Ok(job) = rx_job.recv() {
                        let outcome = (job.prepare)();
                        if let Err(ref e) = outcome {
                            tracing::debug!(
                                target: "prepare",
                                index = job.index,
                                code = e.code(),
                                error = %e,
                                "transaction preparation failed"
                            );
                        }
                        results.insert(job.index, outcome);
                        drop(job.guard);
                    }
                });
            match handle {
                Ok(h) => workers.push(h),
                Err(e) => {
                    tracing::error!(target: "prepare", error = %e, "failed to spawn preparer worker");
                }
            }
            queues.push(tx_job);
        }

        Self {
            queues,
            workers,
            results,
            batch: Mutex::new(Batch {
                count: 0,
                wg: WaitGroup::new(),
            }),
        }
    }

    /// Enqueues the next work item of the current batch. Never blocks.
    pub fn add(&self, prepare: PrepareFn) {
        let mut batch = self.batch.lock();
        let index = batch.count;
        batch.count += 1;

        let job = Job {
            index,
            prepare,
            guard: batch.wg.clone(),
        };
        let queue = &self.queues[index % self.queues.len()];
        if queue.send(job).is_err() {
            // Worker gone (shutdown race); record the failure so the
            // barrier still releases.
            self.results.insert(
                index,
                Err(TrxError::Ledger("preparer worker unavailable".into())),
            );
        }
    }

    /// Blocks until every slot of the current batch is filled, then
    /// returns the results in original submission order.
    pub fn wait(&self) -> Vec<PrepResult> {
        let (count, wg) = {
            let mut batch = self.batch.lock();
            let count = batch.count;
            let wg = std::mem::replace(&mut batch.wg, WaitGroup::new());
            batch.count = 0;
            (count, wg)
        };
        wg.wait();

        (0..count)
            .map(|i| {
                self.results
                    .remove(&i)
                    .map(|(_, r)| r)
                    .unwrap_or_else(|| Err(TrxError::Ledger(format!("missing result slot {}", i))))
            })
            .collect()
    }

    /// Clears any leftover state so the next block starts from an empty
    /// batch.
    pub fn reset(&self) {
        let mut batch = self.batch.lock();
        batch.count = 0;
        batch.wg = WaitGroup::new();
        self.results.clear();
    }

    pub fn worker_count(&self) -> usize {
        self.queues.len()
    }
}

impl Drop for ParallelPreparer {
    fn drop(&mut self) {
        // Disconnect the queues so the workers' recv loops end.
        self.queues.clear();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
