//! Content-addressed copy-on-write Merkle map.
//!
//! This crate provides [`MerkleMap`], the persistent key→value structure
//! backing both the account-state tree and the per-ledger transaction
//! tree. Keys are 256-bit indexes; values are canonical entry bytes.
//!
//! # Structure
//!
//! The map is a 16-way radix trie over the nibbles of the key. Every
//! node is immutable and identified by its content hash:
//!
//! - leaf: `SHA-256(0x00 ‖ key ‖ value)`
//! - inner: `SHA-256(0x01 ‖ child₀ ‖ … ‖ child₁₅)`, empty children
//!   hashing as zero
//!
//! Because a key's position is a pure function of its bits, and because
//! an inner node left with a single leaf child collapses back into that
//! leaf on removal, the trie's shape — and therefore its root digest —
//! depends only on the final set of (key, value) pairs, never on the
//! order of operations that produced it. Independent nodes applying the
//! same logical updates in different orders converge on the same root.
//!
//! # Copy-on-write
//!
//! Nodes are shared through [`Arc`](std::sync::Arc). Cloning a map is
//! O(1); mutating a clone reallocates only the path from the root to the
//! touched leaf, leaving every sibling shared with the original
//! snapshot. This is what lets an open ledger mutate freely while its
//! closed parent stays frozen.
//!
//! # Flushing
//!
//! Every node created since the last flush is tracked as dirty. Once per
//! closed ledger, [`MerkleMap::flush_dirty`] serializes the reachable
//! dirty nodes into a [`NodeStore`] tagged with the closing sequence
//! number. Mutation itself never touches the store.

mod node;
mod store;
mod tree;

pub use node::Node;
pub use store::{MemoryNodeStore, NodeKind, NodeStore};
pub use tree::{Iter, MerkleMap};

use seiche_common::WireError;
use thiserror::Error;

/// Errors produced by tree operations.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A stored node failed to decode.
    #[error("node decode failed: {0}")]
    Decode(#[from] WireError),

    /// A stored node's bytes do not hash to its index.
    #[error("node hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch { expected: String, computed: String },
}

/// Result type for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
