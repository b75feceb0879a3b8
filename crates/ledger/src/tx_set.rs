//! Canonical transaction ordering.
//!
//! Within one application pass, transactions are attempted in a strict
//! total order derived from the batch itself: identifiers are XORed
//! with a salt before sorting, where the salt starts as the digest of
//! the unordered candidate batch. No participant can bias its position
//! in the apply order by grinding transaction identifiers, yet every
//! node derives the same order from the same batch.
//!
//! Between retry passes the salt is re-derived from the previous pass's
//! results ([`next_pass_salt`]), so a failure pattern caused purely by
//! ordering does not repeat itself verbatim on the next pass.

use seiche_common::Hash256;
use seiche_tx::keys::account_index;
use seiche_tx::Transaction;
use std::collections::BTreeMap;

/// Digest of an unordered candidate batch.
///
/// Identifiers are sorted before hashing, so any permutation of the
/// same batch produces the same digest.
pub fn batch_digest(candidates: &[Transaction]) -> Hash256 {
    let mut ids: Vec<Hash256> = candidates.iter().map(|tx| tx.id()).collect();
    ids.sort();
    let chunks: Vec<&[u8]> = ids.iter().map(|id| id.as_bytes().as_slice()).collect();
    Hash256::hash_multi(&chunks)
}

/// Derive the ordering salt for the next retry pass.
///
/// A pure function of the previous salt and the pass's observable
/// results, so all nodes compute the same sequence of salts.
pub fn next_pass_salt(salt: &Hash256, pass: u32, settled_in_pass: u32) -> Hash256 {
    Hash256::hash_multi(&[
        b"pass-salt",
        salt.as_bytes(),
        &pass.to_be_bytes(),
        &settled_in_pass.to_be_bytes(),
    ])
}

/// Sort key for one transaction under one salt.
///
/// Ordering is `(salted account, account sequence, salted id, raw id)`:
/// transactions from one account stay in sequence order relative to
/// each other, account positions are shuffled by the salt, and the raw
/// identifier breaks any remaining tie — two distinct transactions can
/// never compare equal.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
struct CanonicalKey {
    salted_account: Hash256,
    sequence: u32,
    salted_id: Hash256,
    id: Hash256,
}

impl CanonicalKey {
    fn new(tx: &Transaction, salt: &Hash256) -> Self {
        let id = tx.id();
        Self {
            salted_account: account_index(&tx.account).xor(salt),
            sequence: tx.sequence,
            salted_id: id.xor(salt),
            id,
        }
    }
}

/// The ordered working set for one application pass.
#[derive(Clone, Debug)]
pub struct CanonicalTxSet {
    salt: Hash256,
    entries: BTreeMap<CanonicalKey, Transaction>,
}

impl CanonicalTxSet {
    /// An empty set ordered under `salt`.
    pub fn new(salt: Hash256) -> Self {
        Self {
            salt,
            entries: BTreeMap::new(),
        }
    }

    /// Build a set from `candidates` ordered under `salt`.
    pub fn with_candidates(salt: Hash256, candidates: impl IntoIterator<Item = Transaction>) -> Self {
        let mut set = Self::new(salt);
        for tx in candidates {
            set.insert(tx);
        }
        set
    }

    pub fn insert(&mut self, tx: Transaction) {
        self.entries.insert(CanonicalKey::new(&tx, &self.salt), tx);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn salt(&self) -> &Hash256 {
        &self.salt
    }

    /// Iterate in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.entries.values()
    }

    /// Consume the set in canonical order.
    pub fn into_ordered(self) -> Vec<Transaction> {
        self.entries.into_values().collect()
    }
}
