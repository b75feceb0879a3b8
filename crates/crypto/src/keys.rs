//! Ed25519 key types for transaction authorization.
//!
//! This module provides the key types used to sign and verify
//! transactions:
//!
//! - [`PublicKey`]: a 32-byte Ed25519 verifying key
//! - [`SecretKey`]: a 32-byte Ed25519 signing key, zeroized on drop
//! - [`Signature`]: a 64-byte Ed25519 signature
//!
//! Account identifiers are derived from public keys via
//! [`PublicKey::account_id`]. Key material always comes from an explicit
//! seed or an explicit generation call; test harnesses derive
//! deterministic keys with [`SecretKey::from_seed`] rather than any
//! process-global generator.

use crate::error::CryptoError;
use ed25519_dalek::{SigningKey, VerifyingKey};
use seiche_common::AccountId;
use std::fmt;
// SigningKey from ed25519_dalek handles its own zeroization on drop

/// An Ed25519 public key (verifying key).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Creates a public key from raw 32-byte Ed25519 key material.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPublicKey`] if the bytes do not
    /// represent a valid point on the Ed25519 curve.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let key = VerifyingKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(key))
    }

    /// Returns the raw 32-byte key material.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// The 20-byte account identifier derived from this key.
    pub fn account_id(&self) -> AccountId {
        AccountId::from_public_key_bytes(self.as_bytes())
    }

    /// Verifies an Ed25519 signature over a message.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidSignature`] if verification fails.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        use ed25519_dalek::Verifier;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        self.0
            .verify(message, &sig)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.as_bytes()))
    }
}

/// An Ed25519 secret key (signing key).
///
/// The `Debug` implementation does not reveal key material.
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl SecretKey {
    /// Derives a secret key deterministically from a 32-byte seed.
    ///
    /// The same seed always yields the same keypair, which is how test
    /// harnesses construct reproducible account identities.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self(SigningKey::from_bytes(&seed))
    }

    /// Generates a fresh random secret key.
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        Self(SigningKey::generate(&mut rng))
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// The account identifier of the corresponding public key.
    pub fn account_id(&self) -> AccountId {
        self.public_key().account_id()
    }

    /// Signs a message, returning a 64-byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        Signature(self.0.sign(message).to_bytes())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<redacted>)")
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// A placeholder signature of all zeroes.
    ///
    /// Only meaningful together with the applier's skip-signature flag;
    /// it never verifies.
    pub const ZERO: Self = Self([0u8; 64]);

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 64 {
            return Err(CryptoError::InvalidSignatureLength(bytes.len()));
        }
        let mut arr = [0u8; 64];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(&self.0[..8]))
    }
}
