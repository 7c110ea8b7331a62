// Path: crates/api/src/app.rs
//! Request/response shapes of the consensus-engine boundary.
//!
//! The external consensus engine drives the application through a fixed
//! set of synchronous lifecycle calls; these are their wire shapes. JSON
//! follows the repository conventions: camelCase names, 64-bit integers as
//! decimal strings.

use beatoz_types::{Address, Coin, Event, TrxError};
use serde::{Deserialize, Serialize};

/// The decided block header handed to `begin_block`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    #[serde(with = "beatoz_types::json::u64_string")]
    pub height: u64,
    /// Unix nanoseconds.
    #[serde(with = "beatoz_types::json::i64_string")]
    pub time: i64,
    pub chain_id: String,
    pub proposer: Address,
    /// Validators the consensus engine reports as byzantine at this height.
    #[serde(default)]
    pub byzantine: Vec<Address>,
}

/// `info` response: where the application last committed, so the engine
/// can decide whether to replay or resume.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInfo {
    #[serde(with = "beatoz_types::json::u64_string")]
    pub last_height: u64,
    #[serde(with = "hex_bytes")]
    pub last_app_hash: Vec<u8>,
}

/// Admission-check flavor: a first-time check or a re-check of a
/// transaction already sitting in the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckKind {
    New,
    Recheck,
}

/// Outcome of one admission check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseCheckTrx {
    pub code: u32,
    pub log: String,
    pub sender: Option<Address>,
    #[serde(with = "beatoz_types::json::u64_string")]
    pub gas_wanted: u64,
}

/// Outcome of one executed (or rejected) transaction, produced inside
/// `end_block` and delivered through the per-transaction callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrxResult {
    pub code: u32,
    pub log: String,
    #[serde(with = "hex_bytes")]
    pub tx_hash: Vec<u8>,
    #[serde(with = "beatoz_types::json::u64_string")]
    pub gas_used: u64,
    pub fee: Coin,
    /// Partial return data survives a revert so callers can distinguish
    /// "rejected before execution" from "executed and reverted".
    #[serde(with = "hex_bytes")]
    pub return_data: Vec<u8>,
    pub events: Vec<Event>,
}

impl TrxResult {
    pub fn ok(tx_hash: [u8; 32], gas_used: u64, fee: Coin, return_data: Vec<u8>, events: Vec<Event>) -> Self {
        Self {
            code: 0,
            log: String::new(),
            tx_hash: tx_hash.to_vec(),
            gas_used,
            fee,
            return_data,
            events,
        }
    }

    pub fn rejected(tx_hash: Option<[u8; 32]>, err: &TrxError) -> Self {
        let return_data = match err {
            TrxError::Reverted { return_data, .. } => return_data.clone(),
            _ => Vec::new(),
        };
        Self {
            code: err.code(),
            log: err.to_string(),
            tx_hash: tx_hash.map(|h| h.to_vec()).unwrap_or_default(),
            gas_used: 0,
            fee: Coin::zero(),
            return_data,
            events: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// `end_block` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEndBlock {
    pub trx_results: Vec<TrxResult>,
    pub events: Vec<Event>,
    /// The adaptive gas limit that will govern the next block.
    #[serde(with = "beatoz_types::json::u64_string")]
    pub next_block_gas_limit: u64,
}

/// `commit` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseCommit {
    #[serde(with = "hex_bytes")]
    pub app_hash: Vec<u8>,
    #[serde(with = "beatoz_types::json::u64_string")]
    pub height: u64,
}

/// A generic key/value query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestQuery {
    pub path: String,
    #[serde(with = "hex_bytes", default)]
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseQuery {
    pub code: u32,
    pub log: String,
    /// JSON payload on success.
    #[serde(with = "hex_bytes")]
    pub value: Vec<u8>,
}

impl ResponseQuery {
    pub fn ok(value: Vec<u8>) -> Self {
        Self {
            code: 0,
            log: String::new(),
            value,
        }
    }

    pub fn error(code: u32, log: impl Into<String>) -> Self {
        Self {
            code,
            log: log.into(),
            value: Vec::new(),
        }
    }
}

/// The committed form of a block context, persisted to meta storage at
/// commit and reloaded at startup to seed `info` and the next
/// `begin_block`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedBlock {
    #[serde(with = "beatoz_types::json::u64_string")]
    pub height: u64,
    #[serde(with = "beatoz_types::json::i64_string")]
    pub time: i64,
    pub chain_id: String,
    pub proposer: Address,
    #[serde(with = "hex_bytes")]
    pub app_hash: Vec<u8>,
    #[serde(with = "beatoz_types::json::u64_string")]
    pub gas_used: u64,
    pub fee_sum: Coin,
    #[serde(with = "beatoz_types::json::u64_string")]
    pub trx_count: u64,
    /// The gas limit the adaptive controller chose for the next block.
    #[serde(with = "beatoz_types::json::u64_string")]
    pub next_gas_limit: u64,
}

/// Hex codec for binary fields in JSON shapes.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
