//! SHA-256 hashing utilities.
//!
//! All functions return [`Hash256`], the engine's 32-byte digest type.
//! For hashing data that is not available all at once, use
//! [`Sha256Hasher`].

use seiche_common::Hash256;
use sha2::{Digest, Sha256};

/// Computes the SHA-256 hash of the given data.
///
/// # Example
///
/// ```
/// use seiche_crypto::sha256;
///
/// let hash = sha256(b"seiche");
/// assert_eq!(hash.as_bytes().len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Hash256 {
    Hash256::hash(data)
}

/// Computes the SHA-256 hash of multiple data chunks.
///
/// Equivalent to concatenating all chunks and hashing the result, but
/// avoids the intermediate allocation.
pub fn sha256_multi(chunks: &[&[u8]]) -> Hash256 {
    Hash256::hash_multi(chunks)
}

/// A streaming SHA-256 hasher for incremental hash computation.
///
/// # Example
///
/// ```
/// use seiche_crypto::Sha256Hasher;
///
/// let mut hasher = Sha256Hasher::new();
/// hasher.update(b"chunk 1");
/// hasher.update(b"chunk 2");
/// let hash = hasher.finalize();
/// ```
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    /// Creates a new SHA-256 hasher.
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    /// Feeds data into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Consumes the hasher and returns the computed hash.
    pub fn finalize(self) -> Hash256 {
        let result = self.inner.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        Hash256(bytes)
    }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        // Test vector from NIST
        let hash = sha256(b"abc");
        assert_eq!(
            hash.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_multi() {
        assert_eq!(sha256(b"helloworld"), sha256_multi(&[b"hello", b"world"]));
    }

    #[test]
    fn test_streaming_hasher() {
        let mut hasher = Sha256Hasher::new();
        hasher.update(b"hello");
        hasher.update(b"world");
        assert_eq!(hasher.finalize(), sha256(b"helloworld"));
    }
}
