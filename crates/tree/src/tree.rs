//! The copy-on-write Merkle map.

use seiche_common::Hash256;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::node::{Node, BRANCH_FACTOR};
use crate::store::{NodeKind, NodeStore};

/// A persistent, content-addressed key→value map.
///
/// Cloning is O(1) and produces an independent snapshot: mutations on
/// either side reallocate only the touched root-to-leaf path while all
/// other nodes stay shared. The root digest is a pure function of the
/// current (key, value) set.
///
/// # Example
///
/// ```
/// use seiche_common::Hash256;
/// use seiche_tree::MerkleMap;
///
/// let mut map = MerkleMap::new();
/// map.insert(Hash256::hash(b"k"), b"v".to_vec());
///
/// let snapshot = map.clone();
/// map.insert(Hash256::hash(b"k2"), b"v2".to_vec());
///
/// // The snapshot is unaffected by later mutation
/// assert_ne!(map.root_hash(), snapshot.root_hash());
/// assert!(snapshot.get(&Hash256::hash(b"k2")).is_none());
/// ```
#[derive(Clone, Default, Debug)]
pub struct MerkleMap {
    root: Option<Arc<Node>>,
    /// Nodes created since the last flush, by content hash.
    dirty: HashMap<Hash256, Arc<Node>>,
    len: usize,
}

impl MerkleMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of (key, value) pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The root digest. Zero for an empty map.
    pub fn root_hash(&self) -> Hash256 {
        match &self.root {
            Some(node) => *node.hash(),
            None => Hash256::ZERO,
        }
    }

    /// Look up the value stored under `key`.
    pub fn get(&self, key: &Hash256) -> Option<&[u8]> {
        let mut node = self.root.as_deref()?;
        let mut depth = 0;
        loop {
            match node {
                Node::Leaf { key: k, value, .. } => {
                    return if k == key { Some(value.as_slice()) } else { None };
                }
                Node::Inner { children, .. } => {
                    node = children[key.nibble(depth) as usize].as_deref()?;
                    depth += 1;
                }
            }
        }
    }

    pub fn contains_key(&self, key: &Hash256) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace the value under `key`.
    ///
    /// Allocates new nodes only along the root-to-leaf path; everything
    /// else stays shared with prior snapshots.
    pub fn insert(&mut self, key: Hash256, value: Vec<u8>) {
        let (new_root, inserted) =
            Self::insert_rec(self.root.as_ref(), 0, key, value, &mut self.dirty);
        if inserted {
            self.len += 1;
        }
        self.root = Some(new_root);
    }

    fn insert_rec(
        node: Option<&Arc<Node>>,
        depth: usize,
        key: Hash256,
        value: Vec<u8>,
        dirty: &mut HashMap<Hash256, Arc<Node>>,
    ) -> (Arc<Node>, bool) {
        let Some(node) = node else {
            let leaf = Arc::new(Node::leaf(key, value));
            dirty.insert(*leaf.hash(), leaf.clone());
            return (leaf, true);
        };

        match &**node {
            Node::Leaf { key: existing, .. } if *existing == key => {
                let leaf = Arc::new(Node::leaf(key, value));
                dirty.insert(*leaf.hash(), leaf.clone());
                (leaf, false)
            }
            Node::Leaf { key: existing, .. } => {
                let new_leaf = Arc::new(Node::leaf(key, value));
                dirty.insert(*new_leaf.hash(), new_leaf.clone());
                let split = Self::split(node.clone(), *existing, new_leaf, key, depth, dirty);
                (split, true)
            }
            Node::Inner { children, .. } => {
                let idx = key.nibble(depth) as usize;
                let (child, inserted) =
                    Self::insert_rec(children[idx].as_ref(), depth + 1, key, value, dirty);
                let mut new_children = children.clone();
                new_children[idx] = Some(child);
                let inner = Arc::new(Node::inner(new_children));
                dirty.insert(*inner.hash(), inner.clone());
                (inner, inserted)
            }
        }
    }

    /// Build the inner chain separating two leaves whose keys first
    /// diverge at or below `depth`.
    ///
    /// Distinct 256-bit keys always diverge within 64 nibbles, so the
    /// recursion is bounded.
    fn split(
        existing: Arc<Node>,
        existing_key: Hash256,
        new_leaf: Arc<Node>,
        new_key: Hash256,
        depth: usize,
        dirty: &mut HashMap<Hash256, Arc<Node>>,
    ) -> Arc<Node> {
        let old_nibble = existing_key.nibble(depth) as usize;
        let new_nibble = new_key.nibble(depth) as usize;

        let mut children: [Option<Arc<Node>>; BRANCH_FACTOR] = Default::default();
        if old_nibble == new_nibble {
            let child = Self::split(existing, existing_key, new_leaf, new_key, depth + 1, dirty);
            children[old_nibble] = Some(child);
        } else {
            children[old_nibble] = Some(existing);
            children[new_nibble] = Some(new_leaf);
        }

        let inner = Arc::new(Node::inner(children));
        dirty.insert(*inner.hash(), inner.clone());
        inner
    }

    /// Remove the value under `key`. Returns whether the key was present.
    ///
    /// Inner nodes left with a single leaf child collapse back into that
    /// leaf, restoring the canonical shape a fresh build of the same key
    /// set would have.
    pub fn remove(&mut self, key: &Hash256) -> bool {
        let Some(root) = self.root.clone() else {
            return false;
        };
        match Self::remove_rec(&root, 0, key, &mut self.dirty) {
            None => false,
            Some(replacement) => {
                self.root = replacement;
                self.len -= 1;
                true
            }
        }
    }

    /// Returns `None` if the key was absent, otherwise the replacement
    /// for this subtree (`None` meaning the subtree vanished).
    fn remove_rec(
        node: &Arc<Node>,
        depth: usize,
        key: &Hash256,
        dirty: &mut HashMap<Hash256, Arc<Node>>,
    ) -> Option<Option<Arc<Node>>> {
        match &**node {
            Node::Leaf { key: k, .. } => {
                if k == key {
                    Some(None)
                } else {
                    None
                }
            }
            Node::Inner { children, .. } => {
                let idx = key.nibble(depth) as usize;
                let child = children[idx].as_ref()?;
                let replacement = Self::remove_rec(child, depth + 1, key, dirty)?;

                let mut new_children = children.clone();
                new_children[idx] = replacement;

                let live = new_children.iter().flatten().count();
                if live == 0 {
                    return Some(None);
                }
                if live == 1 {
                    let only = new_children.iter().flatten().next().expect("one live child");
                    if only.is_leaf() {
                        // Collapse a lone leaf upward
                        return Some(Some(only.clone()));
                    }
                }

                let inner = Arc::new(Node::inner(new_children));
                dirty.insert(*inner.hash(), inner.clone());
                Some(Some(inner))
            }
        }
    }

    /// Iterate over all (key, value) pairs in key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: self.root.as_deref().into_iter().collect(),
        }
    }

    /// Number of nodes currently tracked as dirty.
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Flush every reachable dirty node into `store`, tagged with the
    /// closing ledger sequence. Called once per closed ledger; clears the
    /// dirty set.
    ///
    /// Returns the number of nodes written.
    pub fn flush_dirty(
        &mut self,
        store: &mut dyn NodeStore,
        kind: NodeKind,
        ledger_seq: u32,
    ) -> usize {
        let mut flushed = 0;
        if let Some(root) = &self.root {
            Self::flush_rec(root, &self.dirty, store, kind, ledger_seq, &mut flushed);
        }
        self.dirty.clear();
        debug!(kind = ?kind, ledger_seq, flushed, "flushed dirty tree nodes");
        flushed
    }

    fn flush_rec(
        node: &Arc<Node>,
        dirty: &HashMap<Hash256, Arc<Node>>,
        store: &mut dyn NodeStore,
        kind: NodeKind,
        ledger_seq: u32,
        flushed: &mut usize,
    ) {
        // A clean node's entire subtree is clean: new nodes always get
        // freshly built parents.
        if !dirty.contains_key(node.hash()) {
            return;
        }
        store.put(kind, ledger_seq, *node.hash(), node.to_bytes());
        *flushed += 1;
        if let Node::Inner { children, .. } = &**node {
            for child in children.iter().flatten() {
                Self::flush_rec(child, dirty, store, kind, ledger_seq, flushed);
            }
        }
    }
}

/// Depth-first iterator over the map's leaves, in key order.
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Hash256, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                Node::Leaf { key, value, .. } => return Some((key, value.as_slice())),
                Node::Inner { children, .. } => {
                    for child in children.iter().rev().flatten() {
                        self.stack.push(child);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryNodeStore;

    fn key(n: u8) -> Hash256 {
        Hash256::hash(&[n])
    }

    #[test]
    fn test_empty_map() {
        let map = MerkleMap::new();
        assert_eq!(map.root_hash(), Hash256::ZERO);
        assert_eq!(map.len(), 0);
        assert!(map.get(&key(1)).is_none());
    }

    #[test]
    fn test_insert_get_remove() {
        let mut map = MerkleMap::new();
        map.insert(key(1), b"one".to_vec());
        map.insert(key(2), b"two".to_vec());

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&key(1)), Some(b"one".as_slice()));
        assert_eq!(map.get(&key(2)), Some(b"two".as_slice()));
        assert!(map.get(&key(3)).is_none());

        assert!(map.remove(&key(1)));
        assert!(!map.remove(&key(1)), "second removal finds nothing");
        assert_eq!(map.len(), 1);
        assert!(map.get(&key(1)).is_none());
    }

    #[test]
    fn test_replace_changes_root() {
        let mut map = MerkleMap::new();
        map.insert(key(1), b"a".to_vec());
        let before = map.root_hash();
        map.insert(key(1), b"b".to_vec());
        assert_ne!(map.root_hash(), before);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_root_is_order_independent() {
        // Same final contents via three different operation histories.
        let entries: Vec<(Hash256, Vec<u8>)> = (0u8..32)
            .map(|n| (key(n), vec![n, n + 1, n + 2]))
            .collect();

        let mut forward = MerkleMap::new();
        for (k, v) in &entries {
            forward.insert(*k, v.clone());
        }

        let mut reverse = MerkleMap::new();
        for (k, v) in entries.iter().rev() {
            reverse.insert(*k, v.clone());
        }

        // Insert extra keys, overwrite some values, then converge.
        let mut churned = MerkleMap::new();
        for (k, _) in &entries {
            churned.insert(*k, b"garbage".to_vec());
        }
        churned.insert(key(200), b"extra".to_vec());
        churned.insert(key(201), b"extra".to_vec());
        for (k, v) in entries.iter().rev() {
            churned.insert(*k, v.clone());
        }
        assert!(churned.remove(&key(200)));
        assert!(churned.remove(&key(201)));

        assert_eq!(forward.root_hash(), reverse.root_hash());
        assert_eq!(forward.root_hash(), churned.root_hash());
    }

    #[test]
    fn test_delete_all_restores_zero_root() {
        let mut map = MerkleMap::new();
        for n in 0u8..16 {
            map.insert(key(n), vec![n]);
        }
        for n in 0u8..16 {
            assert!(map.remove(&key(n)));
        }
        assert_eq!(map.root_hash(), Hash256::ZERO);
        assert!(map.is_empty());
    }

    #[test]
    fn test_snapshot_isolation() {
        let mut map = MerkleMap::new();
        map.insert(key(1), b"one".to_vec());
        let snapshot = map.clone();
        let snapshot_root = snapshot.root_hash();

        map.insert(key(2), b"two".to_vec());
        map.insert(key(1), b"changed".to_vec());

        assert_eq!(snapshot.root_hash(), snapshot_root);
        assert_eq!(snapshot.get(&key(1)), Some(b"one".as_slice()));
        assert!(snapshot.get(&key(2)).is_none());
        assert_eq!(map.get(&key(1)), Some(b"changed".as_slice()));
    }

    #[test]
    fn test_iter_yields_all_entries_in_key_order() {
        let mut map = MerkleMap::new();
        for n in 0u8..20 {
            map.insert(key(n), vec![n]);
        }
        let collected: Vec<Hash256> = map.iter().map(|(k, _)| *k).collect();
        assert_eq!(collected.len(), 20);
        let mut sorted = collected.clone();
        sorted.sort();
        assert_eq!(collected, sorted, "iteration follows key order");
    }

    #[test]
    fn test_flush_dirty_writes_reachable_nodes_once() {
        let mut store = MemoryNodeStore::new();
        let mut map = MerkleMap::new();
        for n in 0u8..8 {
            map.insert(key(n), vec![n]);
        }
        assert!(map.dirty_count() > 0);

        let flushed = map.flush_dirty(&mut store, NodeKind::AccountState, 1);
        assert!(flushed > 0);
        assert_eq!(map.dirty_count(), 0);
        assert!(store.contains(&map.root_hash()));

        // Nothing new to flush
        assert_eq!(map.flush_dirty(&mut store, NodeKind::AccountState, 1), 0);

        // One more insert dirties only a path, not the whole tree
        map.insert(key(100), vec![100]);
        let incremental = map.flush_dirty(&mut store, NodeKind::AccountState, 2);
        assert!(incremental >= 1);
        assert!(
            incremental < flushed,
            "incremental flush should be a path, not the full tree"
        );
        assert_eq!(store.sequence_of(&map.root_hash()), Some(2));
    }
}
