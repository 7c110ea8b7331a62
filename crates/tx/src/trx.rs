// Path: crates/tx/src/trx.rs
//! The versioned transaction envelope and its two wire encodings.

use crate::payload::TrxPayload;
use beatoz_crypto::hash::sha256;
use beatoz_types::codec::{self, put_field, FieldReader};
use beatoz_types::{Address, Coin, TrxError};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Current transaction version.
pub const TRX_VERSION: u32 = 1;

/// A Beatoz transaction. Immutable once signed: every field below except
/// the two signature fields is covered by the signing preimage.
///
/// Two wire encodings round-trip to the same logical transaction:
///
/// * [`Trx::encode_wire`] / [`Trx::decode_wire`] — the recursive
///   length-prefixed form used for signing and peer relay; transaction
///   hashes are computed over these bytes.
/// * [`Trx::to_storage_bytes`] / [`Trx::from_storage_bytes`] — the
///   canonical SCALE form used for persistence and RPC.
///
/// Both decoders enforce the declared-tag/payload-tag equality and the
/// per-type payload size bounds.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trx {
    pub version: u32,
    /// Creation time, unix nanoseconds.
    #[serde(with = "beatoz_types::json::i64_string")]
    pub time: i64,
    #[serde(with = "beatoz_types::json::u64_string")]
    pub nonce: u64,
    pub from: Address,
    pub to: Address,
    /// Declared fee payer; the zero address means the sender pays.
    pub payer: Address,
    pub amount: Coin,
    #[serde(with = "beatoz_types::json::u64_string")]
    pub gas: u64,
    pub gas_price: Coin,
    /// Declared type tag; must equal `payload.tag()`.
    pub trx_type: u32,
    pub payload: TrxPayload,
    /// Sender signature, 65 bytes once signed.
    #[serde(with = "hex_bytes")]
    pub sig: Vec<u8>,
    /// Optional fee-payer signature; empty when the sender pays.
    #[serde(with = "hex_bytes")]
    pub payer_sig: Vec<u8>,
}

impl Trx {
    pub fn new(
        from: Address,
        to: Address,
        amount: Coin,
        gas: u64,
        gas_price: Coin,
        nonce: u64,
        time: i64,
        payload: TrxPayload,
    ) -> Self {
        let trx_type = payload.tag();
        Self {
            version: TRX_VERSION,
            time,
            nonce,
            from,
            to,
            payer: Address::ZERO,
            amount,
            gas,
            gas_price,
            trx_type,
            payload,
            sig: Vec::new(),
            payer_sig: Vec::new(),
        }
    }

    /// True when a distinct fee payer is declared.
    pub fn has_payer(&self) -> bool {
        !self.payer.is_zero() && self.payer != self.from
    }

    /// The address charged gas x price for this transaction.
    pub fn fee_payer(&self) -> Address {
        if self.has_payer() {
            self.payer
        } else {
            self.from
        }
    }

    /// SHA-256 over the signed recursive wire encoding.
    pub fn hash(&self) -> [u8; 32] {
        sha256(self.encode_wire())
    }

    /// Encodes the recursive length-prefixed form, signatures included.
    pub fn encode_wire(&self) -> Vec<u8> {
        let mut out = self.encode_unsigned();
        put_field(&mut out, &self.sig);
        put_field(&mut out, &self.payer_sig);
        out
    }

    /// The recursive form with both signature fields stripped — the base
    /// of every signing preimage.
    pub fn encode_unsigned(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_field(&mut out, &self.version.to_be_bytes());
        put_field(&mut out, &self.time.to_be_bytes());
        put_field(&mut out, &self.nonce.to_be_bytes());
        put_field(&mut out, self.from.as_bytes());
        put_field(&mut out, self.to.as_bytes());
        put_field(&mut out, self.payer.as_bytes());
        put_field(&mut out, &self.amount.to_be_bytes());
        put_field(&mut out, &self.gas.to_be_bytes());
        put_field(&mut out, &self.gas_price.to_be_bytes());
        put_field(&mut out, &self.trx_type.to_be_bytes());
        put_field(&mut out, &self.payload.encode_wire());
        out
    }

    /// Decodes the recursive length-prefixed form.
    pub fn decode_wire(raw: &[u8]) -> Result<Self, TrxError> {
        let mut rd = FieldReader::new(raw);

        let version = read_u32(&mut rd)?;
        let time = read_i64(&mut rd)?;
        let nonce = read_u64(&mut rd)?;
        let from = read_address(&mut rd)?;
        let to = read_address(&mut rd)?;
        let payer = read_address(&mut rd)?;
        let amount = Coin::from_be_bytes(rd.next_field().map_err(TrxError::Decode)?);
        let gas = read_u64(&mut rd)?;
        let gas_price = Coin::from_be_bytes(rd.next_field().map_err(TrxError::Decode)?);
        let trx_type = read_u32(&mut rd)?;
        let body = rd.next_field().map_err(TrxError::Decode)?;
        let payload = TrxPayload::decode_wire(trx_type, body)?;
        let sig = rd.next_field().map_err(TrxError::Decode)?.to_vec();
        let payer_sig = rd.next_field().map_err(TrxError::Decode)?.to_vec();
        rd.finish().map_err(TrxError::Decode)?;

        Ok(Self {
            version,
            time,
            nonce,
            from,
            to,
            payer,
            amount,
            gas,
            gas_price,
            trx_type,
            payload,
            sig,
            payer_sig,
        })
    }

    /// Encodes the canonical SCALE form.
    pub fn to_storage_bytes(&self) -> Vec<u8> {
        codec::to_bytes_canonical(self)
    }

    /// Decodes the canonical SCALE form, re-checking the invariants the
    /// wire decoder enforces structurally.
    pub fn from_storage_bytes(raw: &[u8]) -> Result<Self, TrxError> {
        let tx: Trx = codec::from_bytes_canonical(raw).map_err(TrxError::Decode)?;
        tx.check_payload_tag()?;
        Ok(tx)
    }

    /// Declared type tag must match the payload, and the payload must fit
    /// its type's size bound.
    pub fn check_payload_tag(&self) -> Result<(), TrxError> {
        let actual = self.payload.tag();
        if self.trx_type != actual {
            return Err(TrxError::PayloadTypeMismatch {
                declared: self.trx_type,
                actual,
            });
        }
        let body = self.payload.encode_wire();
        let max = TrxPayload::max_size(self.trx_type);
        if body.len() > max {
            return Err(TrxError::OversizePayload {
                declared: self.trx_type,
                size: body.len(),
                max,
            });
        }
        Ok(())
    }
}

fn read_u32(rd: &mut FieldReader<'_>) -> Result<u32, TrxError> {
    let f = rd.next_field().map_err(TrxError::Decode)?;
    let arr: [u8; 4] = f
        .try_into()
        .map_err(|_| TrxError::Decode("bad u32 field".into()))?;
    Ok(u32::from_be_bytes(arr))
}

fn read_u64(rd: &mut FieldReader<'_>) -> Result<u64, TrxError> {
    let f = rd.next_field().map_err(TrxError::Decode)?;
    let arr: [u8; 8] = f
        .try_into()
        .map_err(|_| TrxError::Decode("bad u64 field".into()))?;
    Ok(u64::from_be_bytes(arr))
}

fn read_i64(rd: &mut FieldReader<'_>) -> Result<i64, TrxError> {
    Ok(read_u64(rd)? as i64)
}

fn read_address(rd: &mut FieldReader<'_>) -> Result<Address, TrxError> {
    let f = rd.next_field().map_err(TrxError::Decode)?;
    Address::from_slice(f).ok_or_else(|| TrxError::Decode("bad address field".into()))
}

/// Hex string codec for signature bytes in JSON.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::TAG_TRANSFER;

    fn sample() -> Trx {
        let mut tx = Trx::new(
            Address([1u8; 20]),
            Address([2u8; 20]),
            Coin::from_u64(5_000),
            100_000,
            Coin::from_u64(10),
            3,
            1_700_000_000_000_000_000,
            TrxPayload::Transfer,
        );
        tx.sig = vec![0xAA; 65];
        tx
    }

    #[test]
    fn wire_round_trip_is_byte_exact() {
        let tx = sample();
        let raw = tx.encode_wire();
        let back = Trx::decode_wire(&raw).unwrap();
        assert_eq!(back, tx);
        assert_eq!(back.encode_wire(), raw);
    }

    #[test]
    fn storage_round_trip_is_byte_exact() {
        let tx = sample();
        let raw = tx.to_storage_bytes();
        let back = Trx::from_storage_bytes(&raw).unwrap();
        assert_eq!(back, tx);
        assert_eq!(back.to_storage_bytes(), raw);
    }

    #[test]
    fn both_encodings_agree_on_the_logical_value() {
        let tx = sample();
        let via_wire = Trx::decode_wire(&tx.encode_wire()).unwrap();
        let via_storage = Trx::from_storage_bytes(&tx.to_storage_bytes()).unwrap();
        assert_eq!(via_wire, via_storage);
        assert_eq!(via_wire.hash(), via_storage.hash());
    }

    #[test]
    fn declared_tag_must_match_payload() {
        let mut tx = sample();
        tx.trx_type = TAG_TRANSFER + 1;
        let raw = tx.to_storage_bytes();
        assert!(matches!(
            Trx::from_storage_bytes(&raw),
            Err(TrxError::PayloadTypeMismatch { .. })
        ));
    }

    #[test]
    fn wire_decode_rejects_padded_transfer_payload() {
        // Hand-craft a transfer whose payload field carries bytes: the
        // no-payload bound must reject it at decode time.
        let tx = sample();
        let mut out = Vec::new();
        beatoz_types::codec::put_field(&mut out, &tx.version.to_be_bytes());
        beatoz_types::codec::put_field(&mut out, &tx.time.to_be_bytes());
        beatoz_types::codec::put_field(&mut out, &tx.nonce.to_be_bytes());
        beatoz_types::codec::put_field(&mut out, tx.from.as_bytes());
        beatoz_types::codec::put_field(&mut out, tx.to.as_bytes());
        beatoz_types::codec::put_field(&mut out, tx.payer.as_bytes());
        beatoz_types::codec::put_field(&mut out, &tx.amount.to_be_bytes());
        beatoz_types::codec::put_field(&mut out, &tx.gas.to_be_bytes());
        beatoz_types::codec::put_field(&mut out, &tx.gas_price.to_be_bytes());
        beatoz_types::codec::put_field(&mut out, &tx.trx_type.to_be_bytes());
        beatoz_types::codec::put_field(&mut out, &[0u8; 4096]); // bogus payload
        beatoz_types::codec::put_field(&mut out, &tx.sig);
        beatoz_types::codec::put_field(&mut out, &tx.payer_sig);

        assert!(matches!(
            Trx::decode_wire(&out),
            Err(TrxError::OversizePayload { .. })
        ));
    }

    #[test]
    fn truncated_wire_bytes_rejected() {
        let raw = sample().encode_wire();
        assert!(Trx::decode_wire(&raw[..raw.len() - 3]).is_err());
    }

    #[test]
    fn fee_payer_defaults_to_sender() {
        let mut tx = sample();
        assert_eq!(tx.fee_payer(), tx.from);
        tx.payer = Address([9u8; 20]);
        assert_eq!(tx.fee_payer(), tx.payer);
        assert!(tx.has_payer());
    }
}
