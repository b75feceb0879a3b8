//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors that can occur in key handling and signature verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The bytes do not represent a valid Ed25519 public key.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,

    /// A signature had the wrong length.
    #[error("invalid signature length: expected 64, got {0}")]
    InvalidSignatureLength(usize),
}
