//! Trie nodes.
//!
//! A node is either a leaf holding one (key, value) pair or an inner
//! node with up to 16 children, one per nibble. Nodes are immutable;
//! their content hash is computed once at construction.

use seiche_common::{Hash256, WireReader, WireWriter};
use std::sync::Arc;

use crate::{Result, TreeError};

/// Number of children per inner node (one per key nibble).
pub const BRANCH_FACTOR: usize = 16;

const LEAF_TAG: u8 = 0x00;
const INNER_TAG: u8 = 0x01;

/// An immutable trie node, identified by its content hash.
#[derive(Debug)]
pub enum Node {
    Leaf {
        key: Hash256,
        value: Vec<u8>,
        hash: Hash256,
    },
    Inner {
        children: [Option<Arc<Node>>; BRANCH_FACTOR],
        hash: Hash256,
    },
}

impl Node {
    /// Build a leaf, computing its content hash.
    pub fn leaf(key: Hash256, value: Vec<u8>) -> Self {
        let hash = Hash256::hash_multi(&[&[LEAF_TAG], key.as_bytes(), &value]);
        Node::Leaf { key, value, hash }
    }

    /// Build an inner node over the given children, computing its hash.
    pub fn inner(children: [Option<Arc<Node>>; BRANCH_FACTOR]) -> Self {
        let tag = [INNER_TAG];
        let mut chunks: Vec<&[u8]> = Vec::with_capacity(BRANCH_FACTOR + 1);
        chunks.push(&tag);
        for child in &children {
            match child {
                Some(node) => chunks.push(node.hash().as_bytes()),
                None => chunks.push(Hash256::ZERO.as_bytes()),
            }
        }
        let hash = Hash256::hash_multi(&chunks);
        Node::Inner { children, hash }
    }

    /// The node's content hash.
    pub fn hash(&self) -> &Hash256 {
        match self {
            Node::Leaf { hash, .. } => hash,
            Node::Inner { hash, .. } => hash,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Canonical bytes for durable storage.
    ///
    /// Leaves carry their key and value; inner nodes carry the 16 child
    /// hashes (zero for empty slots). This is enough for a store reader
    /// to reassemble any snapshot from its root hash.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        match self {
            Node::Leaf { key, value, .. } => {
                w.put_u8(LEAF_TAG);
                w.put_hash(key);
                w.put_var_bytes(value);
            }
            Node::Inner { children, .. } => {
                w.put_u8(INNER_TAG);
                for child in children {
                    match child {
                        Some(node) => w.put_hash(node.hash()),
                        None => w.put_hash(&Hash256::ZERO),
                    }
                }
            }
        }
        w.into_bytes()
    }

    /// Decode a leaf back from stored bytes.
    ///
    /// Inner nodes decode to their child-hash list via
    /// [`Node::child_hashes_from_bytes`]; a leaf decodes to a full node.
    ///
    /// # Errors
    ///
    /// Fails on malformed bytes, or with [`TreeError::HashMismatch`] if
    /// the decoded leaf does not hash back to `expected`.
    pub fn leaf_from_bytes(bytes: &[u8], expected: &Hash256) -> Result<Node> {
        let mut r = WireReader::new(bytes);
        let tag = r.get_u8()?;
        if tag != LEAF_TAG {
            return Err(TreeError::Decode(seiche_common::WireError::UnknownTag {
                tag,
                offset: 0,
            }));
        }
        let key = r.get_hash()?;
        let value = r.get_var_bytes()?.to_vec();
        r.finish()?;
        let node = Node::leaf(key, value);
        if node.hash() != expected {
            return Err(TreeError::HashMismatch {
                expected: expected.to_hex(),
                computed: node.hash().to_hex(),
            });
        }
        Ok(node)
    }

    /// Decode an inner node's child hashes from stored bytes.
    pub fn child_hashes_from_bytes(bytes: &[u8]) -> Result<[Hash256; BRANCH_FACTOR]> {
        let mut r = WireReader::new(bytes);
        let tag = r.get_u8()?;
        if tag != INNER_TAG {
            return Err(TreeError::Decode(seiche_common::WireError::UnknownTag {
                tag,
                offset: 0,
            }));
        }
        let mut hashes = [Hash256::ZERO; BRANCH_FACTOR];
        for slot in hashes.iter_mut() {
            *slot = r.get_hash()?;
        }
        r.finish()?;
        Ok(hashes)
    }
}
