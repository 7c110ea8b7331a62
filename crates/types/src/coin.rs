// Path: crates/types/src/coin.rs
//! Arbitrary-precision, non-negative monetary amounts.

use num_bigint::BigUint;
use num_traits::Zero;
use parity_scale_codec::{Decode, Encode, Error as CodecError, Input, Output};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A non-negative arbitrary-precision amount (balances, fees, gas prices).
///
/// Serialized as a decimal string in JSON so that amounts above 2^53 never
/// lose precision, and as big-endian magnitude bytes in the canonical
/// binary codec so that equal amounts always encode to equal bytes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Coin(BigUint);

impl Coin {
    pub fn zero() -> Self {
        Coin(BigUint::zero())
    }

    pub fn from_u64(v: u64) -> Self {
        Coin(BigUint::from(v))
    }

    pub fn from_be_bytes(b: &[u8]) -> Self {
        Coin(BigUint::from_bytes_be(b))
    }

    /// Big-endian magnitude; empty for zero.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        if self.0.is_zero() {
            Vec::new()
        } else {
            self.0.to_bytes_be()
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(&self, rhs: &Coin) -> Coin {
        Coin(&self.0 + &rhs.0)
    }

    /// `None` when the subtraction would go negative.
    pub fn checked_sub(&self, rhs: &Coin) -> Option<Coin> {
        if self.0 < rhs.0 {
            None
        } else {
            Some(Coin(&self.0 - &rhs.0))
        }
    }

    pub fn mul_u64(&self, rhs: u64) -> Coin {
        Coin(&self.0 * BigUint::from(rhs))
    }

    /// Integer division by a non-zero u64; division by zero yields zero.
    pub fn div_u64(&self, rhs: u64) -> Coin {
        if rhs == 0 {
            Coin::zero()
        } else {
            Coin(&self.0 / BigUint::from(rhs))
        }
    }

    /// Saturating narrowing, for power/weight arithmetic.
    pub fn to_u64_saturating(&self) -> u64 {
        u64::try_from(&self.0).unwrap_or(u64::MAX)
    }
}

impl From<u64> for Coin {
    fn from(v: u64) -> Self {
        Coin::from_u64(v)
    }
}

impl std::fmt::Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Coin({})", self.0)
    }
}

impl std::str::FromStr for Coin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v = s
            .parse::<BigUint>()
            .map_err(|e| format!("invalid decimal amount: {}", e))?;
        Ok(Coin(v))
    }
}

impl Encode for Coin {
    fn encode_to<T: Output + ?Sized>(&self, dest: &mut T) {
        self.to_be_bytes().encode_to(dest);
    }
}

impl Decode for Coin {
    fn decode<I: Input>(input: &mut I) -> Result<Self, CodecError> {
        let raw = Vec::<u8>::decode(input)?;
        // Reject non-minimal encodings so the codec stays canonical.
        if raw.first() == Some(&0) {
            return Err("non-canonical coin encoding (leading zero)".into());
        }
        Ok(Coin::from_be_bytes(&raw))
    }
}

impl Serialize for Coin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Coin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
