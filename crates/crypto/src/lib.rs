//! Cryptographic primitives for the seiche ledger engine.
//!
//! Two concerns live here:
//!
//! - **Hashing** ([`hash`]): SHA-256 in single-shot, multi-chunk, and
//!   streaming form, always producing a
//!   [`Hash256`](seiche_common::Hash256).
//! - **Transaction keys** ([`keys`]): ed25519 signing and verification
//!   for transaction authorization. Key material is always derived from
//!   explicit seeds or generated on request; nothing here keeps global
//!   state.
//!
//! Everything beyond these two concerns — peer transport encryption,
//! key exchange, archival MACs — belongs to layers outside this engine.

mod error;
pub mod hash;
pub mod keys;

pub use error::CryptoError;
pub use hash::{sha256, sha256_multi, Sha256Hasher};
pub use keys::{PublicKey, SecretKey, Signature};

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
