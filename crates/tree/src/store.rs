//! Durable node storage interface.
//!
//! Tree mutation never performs I/O. Instead, nodes created since the
//! last flush are written out in one batch per closed ledger, each
//! tagged with the kind of tree it belongs to and the sequence number of
//! the ledger that produced it. [`NodeStore`] is the seam a durable
//! backend plugs into; [`MemoryNodeStore`] is the in-process
//! implementation used by the engine and its tests.

use seiche_common::Hash256;
use std::collections::HashMap;

/// Which tree a stored node belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeKind {
    /// Account-state tree node.
    AccountState,
    /// Transaction tree node.
    Transaction,
}

/// Sink for flushed tree nodes.
pub trait NodeStore {
    /// Store a node's canonical bytes under its content hash.
    ///
    /// `ledger_seq` is the sequence of the ledger whose close produced
    /// the node. Storing the same hash twice is permitted and must be
    /// idempotent (content-addressing guarantees the bytes match).
    fn put(&mut self, kind: NodeKind, ledger_seq: u32, hash: Hash256, bytes: Vec<u8>);

    /// Fetch a stored node's bytes.
    fn get(&self, hash: &Hash256) -> Option<&[u8]>;
}

/// A stored node record.
#[derive(Debug)]
struct StoredNode {
    kind: NodeKind,
    ledger_seq: u32,
    bytes: Vec<u8>,
}

/// In-memory [`NodeStore`].
#[derive(Default)]
pub struct MemoryNodeStore {
    nodes: HashMap<Hash256, StoredNode>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct nodes stored.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, hash: &Hash256) -> bool {
        self.nodes.contains_key(hash)
    }

    /// The ledger sequence a node was last flushed under.
    pub fn sequence_of(&self, hash: &Hash256) -> Option<u32> {
        self.nodes.get(hash).map(|n| n.ledger_seq)
    }

    /// The tree kind a node was flushed as.
    pub fn kind_of(&self, hash: &Hash256) -> Option<NodeKind> {
        self.nodes.get(hash).map(|n| n.kind)
    }
}

impl NodeStore for MemoryNodeStore {
    fn put(&mut self, kind: NodeKind, ledger_seq: u32, hash: Hash256, bytes: Vec<u8>) {
        self.nodes.insert(
            hash,
            StoredNode {
                kind,
                ledger_seq,
                bytes,
            },
        );
    }

    fn get(&self, hash: &Hash256) -> Option<&[u8]> {
        self.nodes.get(hash).map(|n| n.bytes.as_slice())
    }
}
