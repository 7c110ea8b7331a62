// Path: crates/types/src/error.rs
//! Error taxonomy for the Beatoz application layer.
//!
//! Two families with very different lifetimes:
//!
//! * [`TrxError`] — scoped to one transaction. Captured as that
//!   transaction's outcome, surfaced to the consensus engine as a non-zero
//!   response code plus log text, and never allowed to escape past the
//!   sequential executor.
//! * [`ChainError`] — an unrecoverable lifecycle or invariant failure.
//!   Propagates out of the orchestrator so the surrounding process can
//!   terminate rather than continue with ledgers that disagree with each
//!   other.

use crate::address::Address;
use crate::coin::Coin;
use thiserror::Error;

/// A transaction-scoped failure, fatal to one transaction and never to the
/// block that carries it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrxError {
    /// Malformed transaction bytes or payload.
    #[error("decode failed: {0}")]
    Decode(String),
    /// The declared type tag disagrees with the payload's own tag.
    #[error("payload type mismatch: declared {declared}, payload is {actual}")]
    PayloadTypeMismatch { declared: u32, actual: u32 },
    /// A payload larger than the sanity bound for its declared type.
    #[error("payload of {size} bytes exceeds the {max}-byte bound for type {declared}")]
    OversizePayload { declared: u32, size: usize, max: usize },
    /// Bad signature, wrong chain id, or recovered-address mismatch.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// The sender account does not exist on the ledger.
    #[error("unknown sender account {0}")]
    UnknownSender(Address),
    /// The nonce must equal the expected value exactly.
    #[error("invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: u64, got: u64 },
    #[error("account {address} has {available}, needs {needed}")]
    InsufficientFund {
        address: Address,
        needed: Coin,
        available: Coin,
    },
    /// The declared gas price must equal the governance-mandated price.
    #[error("invalid gas price: declared {declared}, required {required}")]
    InvalidGasPrice { declared: Coin, required: Coin },
    #[error("gas {gas} outside [{min}, {max}]")]
    GasOutOfBounds { gas: u64, min: u64, max: u64 },
    /// The block gas pool cannot cover the reservation.
    #[error("block gas exhausted: requested {requested}, remaining {remaining}")]
    BlockGasExhausted { requested: u64, remaining: u64 },
    /// A sub-system-specific rule violation.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    /// The sender lacks the rights the operation requires.
    #[error("no right: {0}")]
    NoRight(String),
    #[error("height {height} outside voting window [{start}, {end}]")]
    OutsideVotingWindow { height: u64, start: u64, end: u64 },
    /// A ledger sub-system rejected or failed the operation.
    #[error("ledger failure: {0}")]
    Ledger(String),
    /// The contract VM executed and reverted; partial return data is kept
    /// so callers can distinguish this from rejection before execution.
    #[error("execution reverted: {reason}")]
    Reverted { reason: String, return_data: Vec<u8> },
}

impl TrxError {
    /// The stable numeric code reported to the consensus engine. Zero is
    /// reserved for success; these values never change once assigned.
    pub fn code(&self) -> u32 {
        match self {
            Self::Decode(_) => 1,
            Self::PayloadTypeMismatch { .. } => 2,
            Self::OversizePayload { .. } => 3,
            Self::InvalidSignature(_) => 4,
            Self::UnknownSender(_) => 5,
            Self::InvalidNonce { .. } => 6,
            Self::InsufficientFund { .. } => 7,
            Self::InvalidGasPrice { .. } => 8,
            Self::GasOutOfBounds { .. } => 9,
            Self::BlockGasExhausted { .. } => 10,
            Self::InvalidPayload(_) => 11,
            Self::NoRight(_) => 12,
            Self::OutsideVotingWindow { .. } => 13,
            Self::Ledger(_) => 14,
            Self::Reverted { .. } => 15,
        }
    }
}

/// An unrecoverable failure: the node must stop rather than risk divergent
/// replicas. There is no defined recovery for a node whose local ledgers
/// disagree with each other.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Ledger sub-systems committed to different versions.
    #[error("ledger '{ledger}' committed version {got}, expected {expected}")]
    LedgerVersionMismatch {
        ledger: &'static str,
        expected: u64,
        got: u64,
    },
    #[error("invalid block height: expected {expected}, got {got}")]
    HeightMismatch { expected: u64, got: u64 },
    /// A begin/end-block hook failed unexpectedly.
    #[error("lifecycle hook failed in '{ledger}': {reason}")]
    Hook { ledger: &'static str, reason: String },
    #[error("genesis failed: {0}")]
    Genesis(String),
    #[error("meta store failure: {0}")]
    Store(String),
    #[error("lifecycle violation: {0}")]
    Lifecycle(String),
}
