// Path: crates/types/src/event.rs
//! Events emitted by lifecycle hooks and transaction execution.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// One emitted event: a kind plus ordered key/value attributes. Order is
/// part of the consensus-visible output and must be deterministic.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }
}
