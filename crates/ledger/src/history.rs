//! Closed-ledger history and query surface.
//!
//! [`LedgerHistory`] holds every closed ledger this node knows about
//! and answers the queries external callers need: ledger by sequence or
//! hash, account state as of a ledger, transaction outcome by
//! identifier, and ancestor hashes via the skip list. Closed ledgers
//! are immutable, so readers share them through `Arc` without any
//! coordination beyond the index locks.

use crate::snapshot::ClosedLedger;
use parking_lot::RwLock;
use seiche_common::Hash256;
use seiche_tx::TxOutcome;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Default)]
struct HistoryInner {
    by_hash: HashMap<Hash256, Arc<ClosedLedger>>,
    by_seq: BTreeMap<u32, Hash256>,
    /// Transaction id → ledger that recorded it.
    tx_index: HashMap<Hash256, Hash256>,
}

/// Shared store of closed ledgers.
#[derive(Default)]
pub struct LedgerHistory {
    inner: RwLock<HistoryInner>,
}

impl LedgerHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closed ledger.
    pub fn insert(&self, ledger: Arc<ClosedLedger>) {
        let mut inner = self.inner.write();
        for tx_id in ledger.outcomes.keys() {
            inner.tx_index.insert(*tx_id, ledger.hash());
        }
        inner.by_seq.insert(ledger.sequence(), ledger.hash());
        inner.by_hash.insert(ledger.hash(), ledger);
    }

    /// Number of ledgers held.
    pub fn len(&self) -> usize {
        self.inner.read().by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().by_hash.is_empty()
    }

    /// Fetch a ledger by its hash.
    pub fn by_hash(&self, hash: &Hash256) -> Option<Arc<ClosedLedger>> {
        self.inner.read().by_hash.get(hash).cloned()
    }

    /// Fetch a ledger by its sequence.
    pub fn by_seq(&self, sequence: u32) -> Option<Arc<ClosedLedger>> {
        let inner = self.inner.read();
        let hash = inner.by_seq.get(&sequence)?;
        inner.by_hash.get(hash).cloned()
    }

    /// The highest-sequence ledger held.
    pub fn latest(&self) -> Option<Arc<ClosedLedger>> {
        let inner = self.inner.read();
        let (_, hash) = inner.by_seq.iter().next_back()?;
        inner.by_hash.get(hash).cloned()
    }

    /// The recorded outcome of a transaction, wherever it settled.
    ///
    /// Returns the sequence of the recording ledger alongside the
    /// outcome.
    pub fn transaction_outcome(&self, tx_id: &Hash256) -> Option<(u32, TxOutcome)> {
        let inner = self.inner.read();
        let ledger_hash = inner.tx_index.get(tx_id)?;
        let ledger = inner.by_hash.get(ledger_hash)?;
        let outcome = ledger.outcome(tx_id)?;
        Some((ledger.sequence(), *outcome))
    }

    /// Resolve the hash of the ancestor of `from` at `target_seq` by
    /// hopping skip lists, without walking the chain linearly.
    ///
    /// Returns the hash and the number of hops taken; the hop count is
    /// at most `log2(distance) + 1`, each hop following the largest
    /// power-of-two back-pointer that does not overshoot.
    pub fn ancestor_hash(
        &self,
        from: &ClosedLedger,
        target_seq: u32,
    ) -> Option<(Hash256, usize)> {
        if target_seq > from.sequence() {
            return None;
        }
        if target_seq == from.sequence() {
            return Some((from.hash(), 0));
        }

        let mut hops = 0usize;
        // First hop resolves off `from` directly; later hops load
        // intermediate ledgers from the index.
        let mut current: Option<Arc<ClosedLedger>> = None;
        loop {
            let cursor: &ClosedLedger = match &current {
                Some(ledger) => ledger,
                None => from,
            };
            let distance = cursor.sequence() - target_seq;
            debug_assert!(distance > 0);

            // Largest 2^i that does not overshoot the target. The skip
            // list always covers it: entry i exists whenever
            // 2^i <= sequence - GENESIS_SEQ.
            let step = u32::BITS - 1 - distance.leading_zeros();
            let entry = *cursor.skip_list().get(step as usize)?;
            let landed_seq = cursor.sequence() - (1u32 << step);
            hops += 1;

            if landed_seq == target_seq {
                return Some((entry, hops));
            }
            current = Some(self.by_hash(&entry)?);
        }
    }
}
