// Path: crates/crypto/src/sign.rs
//! secp256k1 keypairs and recoverable ECDSA signatures.
//!
//! Signatures are 65 bytes, `R || S || V`. The final byte carries both the
//! recovery id and the signer-variant marker: the legacy V0 scheme stores
//! the recovery id offset by [`V0_MARKER_BASE`], the V1 scheme stores it
//! raw in {0, 1}. Callers that build preimages (the transaction signer)
//! decide which convention to write; this module only signs and recovers
//! over 32-byte digests.

use crate::error::CryptoError;
use crate::hash::keccak256;
use beatoz_types::Address;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSig, SigningKey, VerifyingKey};

/// Length of a recoverable signature: 32-byte R, 32-byte S, 1-byte V.
pub const SIG_LEN: usize = 65;

/// Offset added to the recovery id by the legacy V0 signing scheme.
pub const V0_MARKER_BASE: u8 = 27;

/// A secp256k1 signing key.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

/// A secp256k1 verifying key.
#[derive(Clone, Debug, PartialEq)]
pub struct PublicKey(VerifyingKey);

/// A parsed 65-byte recoverable signature.
#[derive(Clone, Debug, PartialEq)]
pub struct RecoverableSig {
    sig: EcdsaSig,
    /// The raw trailing byte as it appeared on the wire.
    v: u8,
}

impl PrivateKey {
    pub fn from_bytes(b: &[u8]) -> Result<Self, CryptoError> {
        SigningKey::from_slice(b)
            .map(Self)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))
    }

    /// Generates a fresh key from a cryptographic RNG.
    pub fn generate(rng: &mut (impl rand_core::CryptoRng + rand_core::RngCore)) -> Self {
        Self(SigningKey::random(rng))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(*self.0.verifying_key())
    }

    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    /// Signs the Keccak-256 digest of `msg`, returning `R || S` plus the
    /// raw recovery id in {0, 1}. The caller applies its variant marker.
    pub fn sign_recoverable(&self, msg: &[u8]) -> Result<([u8; 64], u8), CryptoError> {
        let digest = keccak256(msg);
        let (sig, recid) = self
            .0
            .sign_prehash_recoverable(&digest)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        let mut rs = [0u8; 64];
        rs.copy_from_slice(&sig.to_bytes());
        Ok((rs, recid.to_byte()))
    }
}

impl PublicKey {
    pub fn from_bytes(b: &[u8]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(b)
            .map(Self)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }

    /// Uncompressed SEC1 encoding (65 bytes, `0x04 || X || Y`).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(false).as_bytes().to_vec()
    }

    /// The address bound to this key: the last 20 bytes of the Keccak-256
    /// hash of the uncompressed point body.
    pub fn address(&self) -> Address {
        let sec1 = self.0.to_encoded_point(false);
        let digest = keccak256(&sec1.as_bytes()[1..]);
        // The digest is 32 bytes, so the 20-byte tail always exists.
        Address::from_slice(&digest[12..]).unwrap_or(Address::ZERO)
    }
}

impl RecoverableSig {
    /// Parses a 65-byte wire signature. The trailing byte is kept verbatim;
    /// [`Self::recovery_id`] interprets it under both marker conventions.
    pub fn from_bytes(b: &[u8]) -> Result<Self, CryptoError> {
        if b.len() != SIG_LEN {
            return Err(CryptoError::InvalidSignature(format!(
                "expected {} bytes, got {}",
                SIG_LEN,
                b.len()
            )));
        }
        let sig = EcdsaSig::from_slice(&b[..64])
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        Ok(Self { sig, v: b[64] })
    }

    pub fn to_bytes(&self) -> [u8; SIG_LEN] {
        let mut out = [0u8; SIG_LEN];
        out[..64].copy_from_slice(&self.sig.to_bytes());
        out[64] = self.v;
        out
    }

    /// The raw trailing byte as it appeared on the wire.
    pub fn v(&self) -> u8 {
        self.v
    }

    /// True when the trailing byte carries the legacy V0 marker offset.
    pub fn has_v0_marker(&self) -> bool {
        self.v >= V0_MARKER_BASE
    }

    /// The normalized recovery id in {0, 1}, independent of the marker.
    pub fn recovery_id(&self) -> Result<RecoveryId, CryptoError> {
        let raw = if self.has_v0_marker() {
            self.v - V0_MARKER_BASE
        } else {
            self.v
        };
        RecoveryId::from_byte(raw)
            .ok_or_else(|| CryptoError::InvalidSignature(format!("recovery byte {}", self.v)))
    }

    /// Recovers the signing key from the Keccak-256 digest of `msg` and
    /// returns it with its bound address.
    pub fn recover(&self, msg: &[u8]) -> Result<(Address, PublicKey), CryptoError> {
        let digest = keccak256(msg);
        let recid = self.recovery_id()?;
        let vk = VerifyingKey::recover_from_prehash(&digest, &self.sig, recid)
            .map_err(|e| CryptoError::Recovery(e.to_string()))?;
        let pk = PublicKey(vk);
        let addr = pk.address();
        Ok((addr, pk))
    }
}

// Re-export the RNG traits test/tool code needs for key generation without
// pulling a direct `rand` dependency into downstream crates.
pub use k256::elliptic_curve::rand_core;
