// Path: crates/types/src/json.rs
//! Shared JSON conventions.
//!
//! Query responses and persisted meta-state use JSON with two fixed rules:
//! 64-bit integers are encoded as decimal strings (JSON numbers lose
//! precision past 2^53) and field names are camelCase regardless of the
//! in-memory names. The string codecs below are meant for
//! `#[serde(with = "...")]` on struct fields.

/// `u64` as a decimal string.
pub mod u64_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// `i64` as a decimal string.
pub mod i64_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
