// Path: crates/tx/src/sign.rs
//! Transaction signing and verification under the two historical signer
//! variants.
//!
//! Both variants sign the Keccak-256 digest of a preimage built from the
//! recursive encoding with the signature fields stripped:
//!
//! * **V0** (legacy) signs a length-prefixed chain-tagged message —
//!   `len(chain_id) || chain_id || len(unsigned) || unsigned` — and stores
//!   the recovery id offset by 27 in the trailing signature byte.
//! * **V1** signs `unsigned || chain_id_num` where `chain_id_num` is the
//!   big-endian u64 taken from the first 8 bytes of SHA-256 of the chain
//!   id string, and normalizes the trailing byte to {0, 1}.
//!
//! The variant is recovered from the trailing marker byte at verification
//! time, so both schemes coexist on one chain.

use crate::trx::Trx;
use beatoz_crypto::hash::sha256;
use beatoz_crypto::sign::V0_MARKER_BASE;
use beatoz_crypto::{PrivateKey, PublicKey, RecoverableSig};
use beatoz_types::codec::put_field;
use beatoz_types::{Address, TrxError};

/// Which signing scheme to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignerVariant {
    V0,
    V1,
}

/// Which signature slot to fill or check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignRole {
    Sender,
    Payer,
}

/// The numeric chain identifier used by the V1 preimage.
pub fn chain_id_num(chain_id: &str) -> u64 {
    let digest = sha256(chain_id.as_bytes());
    // The digest always has 8 leading bytes.
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

fn preimage(tx: &Trx, chain_id: &str, variant: SignerVariant) -> Vec<u8> {
    let unsigned = tx.encode_unsigned();
    match variant {
        SignerVariant::V0 => {
            let mut msg = Vec::with_capacity(unsigned.len() + chain_id.len() + 8);
            put_field(&mut msg, chain_id.as_bytes());
            put_field(&mut msg, &unsigned);
            msg
        }
        SignerVariant::V1 => {
            let mut msg = unsigned;
            msg.extend_from_slice(&chain_id_num(chain_id).to_be_bytes());
            msg
        }
    }
}

/// Signs `tx` in place, filling the slot selected by `role`.
pub fn sign_trx(
    tx: &mut Trx,
    sk: &PrivateKey,
    chain_id: &str,
    variant: SignerVariant,
    role: SignRole,
) -> Result<(), TrxError> {
    let msg = preimage(tx, chain_id, variant);
    let (rs, recid) = sk
        .sign_recoverable(&msg)
        .map_err(|e| TrxError::InvalidSignature(e.to_string()))?;

    let v = match variant {
        SignerVariant::V0 => recid + V0_MARKER_BASE,
        SignerVariant::V1 => recid,
    };
    let mut wire = Vec::with_capacity(65);
    wire.extend_from_slice(&rs);
    wire.push(v);

    match role {
        SignRole::Sender => tx.sig = wire,
        SignRole::Payer => tx.payer_sig = wire,
    }
    Ok(())
}

fn recover_role(
    tx: &Trx,
    chain_id: &str,
    raw_sig: &[u8],
) -> Result<(Address, PublicKey), TrxError> {
    let sig =
        RecoverableSig::from_bytes(raw_sig).map_err(|e| TrxError::InvalidSignature(e.to_string()))?;
    let variant = if sig.has_v0_marker() {
        SignerVariant::V0
    } else {
        SignerVariant::V1
    };
    let msg = preimage(tx, chain_id, variant);
    sig.recover(&msg)
        .map_err(|e| TrxError::InvalidSignature(e.to_string()))
}

/// Verifies the sender signature against `chain_id`. The recovered address
/// must exactly equal the declared sender.
pub fn verify_trx(tx: &Trx, chain_id: &str) -> Result<(Address, PublicKey), TrxError> {
    if tx.sig.is_empty() {
        return Err(TrxError::InvalidSignature("missing sender signature".into()));
    }
    let (addr, pk) = recover_role(tx, chain_id, &tx.sig)?;
    if addr != tx.from {
        return Err(TrxError::InvalidSignature(format!(
            "recovered sender {} != declared {}",
            addr, tx.from
        )));
    }
    Ok((addr, pk))
}

/// Verifies the fee-payer signature when a distinct payer is declared.
/// Returns `None` when the sender pays its own fee.
pub fn verify_payer(tx: &Trx, chain_id: &str) -> Result<Option<(Address, PublicKey)>, TrxError> {
    if !tx.has_payer() {
        return Ok(None);
    }
    if tx.payer_sig.is_empty() {
        return Err(TrxError::InvalidSignature(
            "declared payer without payer signature".into(),
        ));
    }
    let (addr, pk) = recover_role(tx, chain_id, &tx.payer_sig)?;
    if addr != tx.payer {
        return Err(TrxError::InvalidSignature(format!(
            "recovered payer {} != declared {}",
            addr, tx.payer
        )));
    }
    Ok(Some((addr, pk)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::TrxPayload;
    use beatoz_types::Coin;
    use rand::rngs::OsRng;

    const CHAIN: &str = "beatoz-testnet-1";

    fn unsigned_trx(sk: &PrivateKey) -> Trx {
        Trx::new(
            sk.address(),
            Address([2u8; 20]),
            Coin::from_u64(1_000),
            50_000,
            Coin::from_u64(10),
            0,
            1_700_000_000_000_000_000,
            TrxPayload::Transfer,
        )
    }

    #[test]
    fn both_variants_round_trip() {
        for variant in [SignerVariant::V0, SignerVariant::V1] {
            let sk = PrivateKey::generate(&mut OsRng);
            let mut tx = unsigned_trx(&sk);
            sign_trx(&mut tx, &sk, CHAIN, variant, SignRole::Sender).unwrap();
            let (addr, pk) = verify_trx(&tx, CHAIN).unwrap();
            assert_eq!(addr, sk.address());
            assert_eq!(pk, sk.public_key());
        }
    }

    #[test]
    fn wrong_chain_id_fails() {
        let sk = PrivateKey::generate(&mut OsRng);
        let mut tx = unsigned_trx(&sk);
        sign_trx(&mut tx, &sk, CHAIN, SignerVariant::V1, SignRole::Sender).unwrap();
        assert!(verify_trx(&tx, "beatoz-mainnet-1").is_err());
    }

    #[test]
    fn recovered_address_must_match_declared_sender() {
        let sk = PrivateKey::generate(&mut OsRng);
        let mut tx = unsigned_trx(&sk);
        tx.from = Address([0x55; 20]); // not the signer
        sign_trx(&mut tx, &sk, CHAIN, SignerVariant::V0, SignRole::Sender).unwrap();
        assert!(matches!(
            verify_trx(&tx, CHAIN),
            Err(TrxError::InvalidSignature(_))
        ));
    }

    #[test]
    fn missing_sender_signature_is_invalid() {
        let sk = PrivateKey::generate(&mut OsRng);
        let tx = unsigned_trx(&sk);
        assert!(verify_trx(&tx, CHAIN).is_err());
    }

    #[test]
    fn distinct_payer_signature_checked_separately() {
        let sender = PrivateKey::generate(&mut OsRng);
        let payer = PrivateKey::generate(&mut OsRng);

        let mut tx = unsigned_trx(&sender);
        tx.payer = payer.address();
        sign_trx(&mut tx, &sender, CHAIN, SignerVariant::V1, SignRole::Sender).unwrap();
        // Declared payer but no payer signature yet.
        assert!(verify_payer(&tx, CHAIN).is_err());

        sign_trx(&mut tx, &payer, CHAIN, SignerVariant::V1, SignRole::Payer).unwrap();
        let (addr, _) = verify_payer(&tx, CHAIN).unwrap().unwrap();
        assert_eq!(addr, payer.address());

        // Sender signature is still intact and verifiable.
        verify_trx(&tx, CHAIN).unwrap();
    }

    #[test]
    fn single_bit_mutations_fail_verification() {
        let sk = PrivateKey::generate(&mut OsRng);
        let mut tx = unsigned_trx(&sk);
        sign_trx(&mut tx, &sk, CHAIN, SignerVariant::V1, SignRole::Sender).unwrap();

        for byte in [0usize, 31, 63] {
            let mut mutated = tx.clone();
            mutated.sig[byte] ^= 0x01;
            assert!(verify_trx(&mutated, CHAIN).is_err(), "byte {}", byte);
        }
    }

    #[test]
    fn chain_id_num_is_deterministic() {
        assert_eq!(chain_id_num(CHAIN), chain_id_num(CHAIN));
        assert_ne!(chain_id_num(CHAIN), chain_id_num("other-chain"));
    }
}
