// Path: crates/types/src/address.rs
//! Fixed-length account addresses.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The byte length of every account address.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account address.
///
/// The all-zero address is a valid transaction target: contract-creation
/// transactions address it, and it doubles as the burn sink. It is created
/// on demand by the account ledger like any other receiver.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Encode, Decode)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The zero (contract-creation / burn) address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    pub fn from_slice(b: &[u8]) -> Option<Self> {
        let arr: [u8; ADDRESS_LEN] = b.try_into().ok()?;
        Some(Self(arr))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", hex::encode_upper(self.0))
    }
}

impl std::str::FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| format!("invalid address hex: {}", e))?;
        Address::from_slice(&raw).ok_or_else(|| format!("address must be {} bytes", ADDRESS_LEN))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_upper(self.0))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
