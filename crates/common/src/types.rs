//! Core identifier types.
//!
//! This module provides [`Hash256`], the canonical 256-bit digest used
//! throughout the engine, and [`AccountId`], the 20-byte account
//! identifier derived from an ed25519 public key.

use sha2::{Digest, Sha256};
use std::fmt;

/// A 32-byte SHA-256 digest.
///
/// This is the canonical hash type used for ledger hashes, transaction
/// identifiers, state-tree roots, and derived object indexes.
///
/// # Examples
///
/// ```rust
/// use seiche_common::Hash256;
///
/// // Hash some data
/// let hash = Hash256::hash(b"hello world");
/// assert!(!hash.is_zero());
///
/// // Convert to/from hex
/// let hex_str = hash.to_hex();
/// let parsed = Hash256::from_hex(&hex_str).unwrap();
/// assert_eq!(hash, parsed);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash (all bytes are 0x00).
    ///
    /// Used as a sentinel: the parent hash of a genesis ledger and the
    /// root digest of an empty tree.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Compute the SHA-256 hash of arbitrary data.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Compute the SHA-256 hash of multiple data chunks.
    ///
    /// Equivalent to concatenating all chunks and hashing the result,
    /// without allocating an intermediate buffer.
    pub fn hash_multi(chunks: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for chunk in chunks {
            hasher.update(chunk);
        }
        let result = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Returns a reference to the underlying 32-byte array.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Creates a `Hash256` from a 32-byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Creates a `Hash256` from a hexadecimal string.
    ///
    /// The string must be exactly 64 hex characters (representing 32
    /// bytes).
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex or not exactly 64
    /// characters.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Converts the hash to a lowercase hexadecimal string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns `true` if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Byte-wise XOR of two digests.
    ///
    /// Canonical transaction ordering sorts by identifiers XORed with a
    /// batch-derived salt, so no participant can bias its position in the
    /// apply order by grinding transaction identifiers.
    pub fn xor(&self, other: &Hash256) -> Hash256 {
        let mut out = [0u8; 32];
        for (i, b) in out.iter_mut().enumerate() {
            *b = self.0[i] ^ other.0[i];
        }
        Hash256(out)
    }

    /// The nibble (half-byte) at the given depth, high nibble first.
    ///
    /// State-tree traversal consumes the key four bits at a time; depth 0
    /// is the high nibble of byte 0.
    pub fn nibble(&self, depth: usize) -> u8 {
        let byte = self.0[depth / 2];
        if depth % 2 == 0 {
            byte >> 4
        } else {
            byte & 0x0f
        }
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 20-byte account identifier.
///
/// Derived from the account's ed25519 public key by truncating its
/// SHA-256 digest. Account identities are always explicit inputs to the
/// engine; nothing in this workspace generates them from ambient state.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccountId(pub [u8; 20]);

impl AccountId {
    /// Derive an account identifier from raw public-key bytes.
    pub fn from_public_key_bytes(public_key: &[u8]) -> Self {
        let digest = Hash256::hash(public_key);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.0[..20]);
        Self(bytes)
    }

    /// Returns a reference to the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Converts the identifier to a lowercase hexadecimal string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_hex())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 20]> for AccountId {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash256_hash() {
        let hash = Hash256::hash(b"hello");
        assert!(!hash.is_zero());

        // Same input should produce same hash
        let hash2 = Hash256::hash(b"hello");
        assert_eq!(hash, hash2);

        // Different input should produce different hash
        let hash3 = Hash256::hash(b"world");
        assert_ne!(hash, hash3);
    }

    #[test]
    fn test_hash256_known_vector() {
        // NIST test vector
        let hash = Hash256::hash(b"abc");
        assert_eq!(
            hash.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash256_hex_roundtrip() {
        let hash = Hash256::hash(b"test");
        let hex = hash.to_hex();
        let parsed = Hash256::from_hex(&hex).unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn test_hash256_hex_rejects_bad_length() {
        assert!(Hash256::from_hex("abcd").is_err());
    }

    #[test]
    fn test_hash256_multi_matches_concat() {
        let whole = Hash256::hash(b"helloworld");
        let parts = Hash256::hash_multi(&[b"hello", b"world"]);
        assert_eq!(whole, parts);
    }

    #[test]
    fn test_hash256_xor() {
        let a = Hash256::hash(b"a");
        let b = Hash256::hash(b"b");
        let x = a.xor(&b);

        // XOR is self-inverse
        assert_eq!(x.xor(&b), a);
        assert_eq!(x.xor(&a), b);
        assert_eq!(a.xor(&a), Hash256::ZERO);
    }

    #[test]
    fn test_hash256_nibbles() {
        let h = Hash256::from_bytes({
            let mut b = [0u8; 32];
            b[0] = 0xab;
            b[1] = 0xcd;
            b
        });
        assert_eq!(h.nibble(0), 0xa);
        assert_eq!(h.nibble(1), 0xb);
        assert_eq!(h.nibble(2), 0xc);
        assert_eq!(h.nibble(3), 0xd);
    }

    #[test]
    fn test_account_id_derivation() {
        let a = AccountId::from_public_key_bytes(&[1u8; 32]);
        let b = AccountId::from_public_key_bytes(&[2u8; 32]);
        assert_ne!(a, b);

        // Deterministic
        assert_eq!(a, AccountId::from_public_key_bytes(&[1u8; 32]));
    }
}
