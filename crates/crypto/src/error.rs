// Path: crates/crypto/src/error.rs
//! Error type for cryptographic operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("recovery failed: {0}")]
    Recovery(String),
}
