// Path: crates/api/src/ledger.rs
//! The ledger sub-system trait family.
//!
//! Every slice of chain state (accounts, governance, staking power, the
//! contract VM, token supply) is an independently committed sub-system
//! behind the [`Ledger`] trait. Sub-systems advance in lock-step: the
//! orchestrator drives their begin/end-block hooks and commits in one
//! fixed order, and a commit that yields diverging versions is fatal.
//!
//! The base [`Ledger`] trait is what the lifecycle machinery iterates
//! over; the capability accessors (`as_accounts`, `as_gov`, ...) expose
//! the narrower surfaces the executor consults for cross-ledger facts.

use crate::context::{BlockContext, TrxContext};
use beatoz_types::{Account, Address, ChainError, Coin, Event, GovParams, TrxError};
use parking_lot::RwLock;
use std::sync::Arc;

/// An account handed out by the account ledger. Every resolver of one
/// address within a lane observes the same underlying object; this is what
/// makes concurrent find-or-create idempotent and lets a later transaction
/// observe the mutations of an earlier one in the same block.
pub type SharedAccount = Arc<RwLock<Account>>;

/// Which view of ledger state an operation runs against.
///
/// `Exec` is the canonical lane: block execution mutates it and `commit`
/// persists it. `Check` is the mempool lane used by admission checks; it
/// simulates balance and nonce movement without ever reaching the
/// canonical state, and is re-synchronized to the committed state at every
/// commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lane {
    Exec,
    Check,
}

/// One independently committed ledger sub-system.
pub trait Ledger: Send + Sync {
    /// Stable lowercase identifier, also the commit-order sort key.
    fn name(&self) -> &'static str;

    /// Type-specific admission rules for a transaction this ledger owns.
    /// Runs inside the sequential phase, after the common checks.
    fn validate_trx(&self, ctx: &TrxContext) -> Result<(), TrxError>;

    /// Type-specific state transition. Only ever called on the single
    /// sequential execution thread.
    fn execute_trx(&self, ctx: &mut TrxContext) -> Result<(), TrxError>;

    /// Height-triggered effects before any transaction of the block runs.
    fn begin_block(&self, bctx: &BlockContext) -> Result<Vec<Event>, ChainError>;

    /// Height-triggered effects after the last transaction of the block.
    fn end_block(&self, bctx: &BlockContext) -> Result<Vec<Event>, ChainError>;

    /// Persists pending mutations; returns the sub-system's state hash and
    /// the version (height) it committed to.
    fn commit(&self) -> Result<([u8; 32], u64), ChainError>;

    /// Releases resources. Idempotent.
    fn close(&self) -> Result<(), ChainError>;

    fn as_accounts(&self) -> Option<&dyn AccountStore> {
        None
    }
    fn as_gov(&self) -> Option<&dyn GovStore> {
        None
    }
    fn as_staking(&self) -> Option<&dyn StakingStore> {
        None
    }
    fn as_supply(&self) -> Option<&dyn SupplyStore> {
        None
    }
}

/// The account sub-system's read-modify-write surface.
pub trait AccountStore {
    /// Looks up an existing account in `lane`. `None` if it has never been
    /// seen on the canonical state nor created in the lane.
    fn find_account(&self, addr: &Address, lane: Lane) -> Option<SharedAccount>;

    /// Looks up or lazily creates an account. Concurrent callers for the
    /// same address always receive the same underlying object.
    fn find_or_new(&self, addr: &Address, lane: Lane) -> SharedAccount;

    /// Registers `acct` (keyed by its own address) for persistence in
    /// `lane`. Idempotent for handles that came out of this store.
    fn set_account(&self, acct: &SharedAccount, lane: Lane);

    fn add_balance(&self, addr: &Address, amt: &Coin, lane: Lane) -> Result<(), TrxError>;
    fn sub_balance(&self, addr: &Address, amt: &Coin, lane: Lane) -> Result<(), TrxError>;

    /// Atomic check-then-move between two accounts in `lane`.
    fn transfer(&self, from: &Address, to: &Address, amt: &Coin, lane: Lane)
        -> Result<(), TrxError>;

    /// A read-only snapshot of the last committed state, used by queries
    /// and read-only VM calls.
    fn committed_account(&self, addr: &Address) -> Option<Account>;
}

/// The governance sub-system's parameter surface, consumed by the executor
/// on every transaction.
pub trait GovStore {
    fn params(&self) -> GovParams;
}

/// The staking sub-system's power surface.
pub trait StakingStore {
    fn power_of(&self, addr: &Address) -> u64;
    fn total_power(&self) -> u64;
    fn is_validator(&self, addr: &Address) -> bool;
}

/// The supply sub-system's read surface.
pub trait SupplyStore {
    fn total_supply(&self) -> Coin;
    fn reward_of(&self, addr: &Address) -> Coin;
}

/// The fixed-order directory of ledger sub-systems.
///
/// All lifecycle traversal (begin-block hooks, end-block hooks, commits,
/// hash aggregation) uses [`LedgerSet::in_order`]; the order is part of
/// consensus and never varies at runtime.
#[derive(Clone)]
pub struct LedgerSet {
    pub account: Arc<dyn Ledger>,
    pub gov: Arc<dyn Ledger>,
    pub staking: Arc<dyn Ledger>,
    pub supply: Arc<dyn Ledger>,
    pub vm: Arc<dyn Ledger>,
}

impl LedgerSet {
    /// Every sub-system in the canonical commit order.
    pub fn in_order(&self) -> [&Arc<dyn Ledger>; 5] {
        [
            &self.account,
            &self.gov,
            &self.staking,
            &self.supply,
            &self.vm,
        ]
    }

    pub fn accounts(&self) -> Option<&dyn AccountStore> {
        self.account.as_accounts()
    }

    pub fn gov_params(&self) -> Option<GovParams> {
        self.gov.as_gov().map(|g| g.params())
    }

    pub fn staking(&self) -> Option<&dyn StakingStore> {
        self.staking.as_staking()
    }

    pub fn supply(&self) -> Option<&dyn SupplyStore> {
        self.supply.as_supply()
    }
}

impl std::fmt::Debug for LedgerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.in_order().iter().map(|l| l.name()))
            .finish()
    }
}
