//! The ledger closer.
//!
//! [`LedgerCloser::close`] is the single entry point that turns a
//! closed parent plus consensus-agreed close data into the next closed
//! ledger. The pipeline is: validate the agreed inputs against the
//! parent (fatal on mismatch), run the multi-pass apply loop over the
//! canonically ordered candidate batch, then seal.
//!
//! # Retry passes
//!
//! Transactions whose preconditions are not met yet — a source account
//! funded later in the same batch, a sequence number behind a sibling
//! transaction — return Retry and stay in the retriable set. Each pass
//! reorders the remaining set under a fresh salt derived from the
//! previous pass's results and tries again. The loop stops when the
//! set drains, when a pass settles nothing (no progress is possible),
//! or at [`CloseConfig::max_apply_passes`]; whatever remains is
//! dropped uncharged, free to reappear in a later candidate batch.

use crate::header::{compute_header_hash, LedgerHeader};
use crate::history::LedgerHistory;
use crate::snapshot::{ClosedLedger, OpenLedger, GENESIS_SEQ};
use crate::tx_set::{batch_digest, next_pass_salt, CanonicalTxSet};
use crate::{LedgerError, Result};
use seiche_common::time::{round_close_time, DEFAULT_CLOSE_TIME_RESOLUTION};
use seiche_common::Hash256;
use seiche_tree::{NodeKind, NodeStore};
use seiche_tx::{apply, ApplyFlags, Transaction, TxOutcome};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tunables for the closing operation.
#[derive(Clone, Debug)]
pub struct CloseConfig {
    /// Upper bound on apply passes; a safety valve, not a tuning knob.
    /// Transactions still retriable past it are dropped uncharged.
    pub max_apply_passes: u32,
    /// Verify transaction signatures during apply. Disabled only in
    /// controlled or test contexts.
    pub check_signatures: bool,
}

impl Default for CloseConfig {
    fn default() -> Self {
        Self {
            max_apply_passes: 10,
            check_signatures: true,
        }
    }
}

/// Consensus-agreed inputs to one closing operation.
#[derive(Clone, Debug)]
pub struct CloseData {
    /// The agreed candidate batch, in no particular order.
    pub candidates: Vec<Transaction>,
    /// The agreed digest of the unordered batch; also the pass-0
    /// ordering salt.
    pub set_hash: Hash256,
    /// Agreed close time in seconds.
    pub close_time: u64,
    /// Granularity the close time is rounded to.
    pub close_time_resolution: u32,
    /// Whether the agreed close time is considered exact.
    pub close_flag: bool,
    /// The hash the parent ledger is agreed to have.
    pub parent_hash: Hash256,
}

impl CloseData {
    /// Close data for `candidates` on top of `parent`, with the batch
    /// digest computed locally and default close-time metadata.
    pub fn new(candidates: Vec<Transaction>, close_time: u64, parent: &ClosedLedger) -> Self {
        let set_hash = batch_digest(&candidates);
        Self {
            candidates,
            set_hash,
            close_time,
            close_time_resolution: DEFAULT_CLOSE_TIME_RESOLUTION,
            close_flag: true,
            parent_hash: parent.hash(),
        }
    }
}

/// Executes closing operations.
#[derive(Default)]
pub struct LedgerCloser {
    config: CloseConfig,
}

impl LedgerCloser {
    pub fn new(config: CloseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CloseConfig {
        &self.config
    }

    /// Close the next ledger on top of `parent`.
    ///
    /// On success the new ledger is registered in `history` and
    /// returned. The whole operation is deterministic: the same parent
    /// and close data produce a byte-identical ledger hash on every
    /// node.
    ///
    /// # Errors
    ///
    /// Fatal only: agreed parent hash or batch digest mismatch, parent
    /// state-root inconsistency, unresolvable skip-list ancestors, or
    /// state corruption during apply. Nothing is published on error.
    pub fn close(
        &self,
        parent: &ClosedLedger,
        data: CloseData,
        store: &mut dyn NodeStore,
        history: &LedgerHistory,
    ) -> Result<Arc<ClosedLedger>> {
        self.validate(parent, &data)?;

        let mut open = OpenLedger::from_parent(parent);
        let flags = ApplyFlags {
            open_ledger: false,
            skip_signature_check: !self.config.check_signatures,
        };

        let candidate_count = data.candidates.len();
        let mut retriable = data.candidates.clone();
        let mut salt = data.set_hash;
        let mut pass: u32 = 0;

        while !retriable.is_empty() {
            let ordered = CanonicalTxSet::with_candidates(salt, std::mem::take(&mut retriable));
            let mut settled: u32 = 0;

            for tx in ordered.into_ordered() {
                let (code, applied) = apply(&mut open, &tx, flags)?;
                if code.is_retry() {
                    retriable.push(tx);
                    continue;
                }
                settled += 1;
                if applied {
                    let outcome = TxOutcome {
                        code,
                        fee_charged: tx.fee,
                    };
                    open.record_outcome(&tx, outcome);
                }
            }

            debug!(
                sequence = open.sequence(),
                pass,
                settled,
                retriable = retriable.len(),
                "apply pass complete"
            );

            if retriable.is_empty() {
                break;
            }
            if settled == 0 {
                warn!(
                    sequence = open.sequence(),
                    dropped = retriable.len(),
                    "no progress; dropping retriable transactions uncharged"
                );
                break;
            }
            pass += 1;
            if pass >= self.config.max_apply_passes {
                warn!(
                    sequence = open.sequence(),
                    dropped = retriable.len(),
                    max_apply_passes = self.config.max_apply_passes,
                    "pass bound reached; dropping retriable transactions uncharged"
                );
                break;
            }
            salt = next_pass_salt(&salt, pass, settled);
        }

        let closed = self.seal(open, parent, &data, store, history)?;
        info!(
            sequence = closed.sequence(),
            hash = %closed.hash(),
            candidates = candidate_count,
            recorded = closed.tx_count(),
            passes = pass + 1,
            "ledger closed"
        );
        Ok(closed)
    }

    /// Fatal pre-checks against the consensus-agreed inputs.
    fn validate(&self, parent: &ClosedLedger, data: &CloseData) -> Result<()> {
        if data.parent_hash != parent.hash() {
            return Err(LedgerError::HashMismatch {
                expected: parent.hash().to_hex(),
                actual: data.parent_hash.to_hex(),
            });
        }

        let computed = batch_digest(&data.candidates);
        if computed != data.set_hash {
            return Err(LedgerError::HashMismatch {
                expected: data.set_hash.to_hex(),
                actual: computed.to_hex(),
            });
        }

        // The parent's own commitment must still hold; divergence here
        // means memory corruption, and closing on top of it would
        // publish a wrong ledger.
        if parent.state_tree.root_hash() != parent.header().state_root {
            return Err(LedgerError::HashMismatch {
                expected: parent.header().state_root.to_hex(),
                actual: parent.state_tree.root_hash().to_hex(),
            });
        }

        Ok(())
    }

    /// Flush, compute roots and skip list, fix the hash, and freeze.
    fn seal(
        &self,
        mut open: OpenLedger,
        parent: &ClosedLedger,
        data: &CloseData,
        store: &mut dyn NodeStore,
        history: &LedgerHistory,
    ) -> Result<Arc<ClosedLedger>> {
        let sequence = open.sequence();
        let flushed_state = open
            .state_tree
            .flush_dirty(store, NodeKind::AccountState, sequence);
        let flushed_tx = open
            .tx_tree
            .flush_dirty(store, NodeKind::Transaction, sequence);
        debug!(sequence, flushed_state, flushed_tx, "flushed dirty nodes");

        let skip_list = build_skip_list(parent, history)?;

        let header = LedgerHeader {
            sequence,
            parent_hash: open.parent_hash(),
            state_root: open.state_tree.root_hash(),
            tx_root: open.tx_tree.root_hash(),
            close_time: round_close_time(data.close_time, data.close_time_resolution),
            close_time_resolution: data.close_time_resolution,
            close_flag: data.close_flag,
            total_drops: open.total_drops - open.fees_destroyed,
        };
        let hash = compute_header_hash(&header);

        let closed = Arc::new(ClosedLedger {
            header,
            hash,
            skip_list,
            state_tree: open.state_tree,
            tx_tree: open.tx_tree,
            outcomes: open.outcomes,
        });
        history.insert(closed.clone());
        Ok(closed)
    }
}

/// Skip list for the child of `parent`: entry `i` is the hash of the
/// ledger at `child_seq - 2^i`, as far back as genesis. Built by
/// hopping the parent's own skip list, so construction is logarithmic
/// per entry.
fn build_skip_list(parent: &ClosedLedger, history: &LedgerHistory) -> Result<Vec<Hash256>> {
    let child_seq = parent.sequence() + 1;
    let mut list = vec![parent.hash()];

    for i in 1..u32::BITS {
        let Some(target) = child_seq.checked_sub(1u32 << i) else {
            break;
        };
        if target < GENESIS_SEQ {
            break;
        }
        let (hash, _) = history
            .ancestor_hash(parent, target)
            .ok_or(LedgerError::MissingAncestor { sequence: target })?;
        list.push(hash);
    }

    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seiche_common::Amount;
    use seiche_crypto::SecretKey;
    use seiche_tree::MemoryNodeStore;
    use seiche_tx::{ResultCode, TxKind};

    fn keypair(n: u8) -> SecretKey {
        SecretKey::from_seed([n; 32])
    }

    fn pay(from: &SecretKey, to: &SecretKey, sequence: u32, drops: i64) -> Transaction {
        Transaction::signed(
            from,
            sequence,
            100,
            TxKind::Payment {
                destination: to.account_id(),
                amount: Amount::drops(drops),
            },
        )
    }

    struct Harness {
        store: MemoryNodeStore,
        history: LedgerHistory,
        closer: LedgerCloser,
        head: Arc<ClosedLedger>,
    }

    impl Harness {
        fn new(master: &SecretKey, starting_drops: i64) -> Self {
            let mut store = MemoryNodeStore::new();
            let genesis = Arc::new(ClosedLedger::genesis(
                master.account_id(),
                starting_drops,
                &mut store,
            ));
            let history = LedgerHistory::new();
            history.insert(genesis.clone());
            Self {
                store,
                history,
                closer: LedgerCloser::default(),
                head: genesis,
            }
        }

        fn close(&mut self, candidates: Vec<Transaction>) -> Arc<ClosedLedger> {
            let close_time = 1_000 + 10 * self.head.sequence() as u64;
            let data = CloseData::new(candidates, close_time, &self.head);
            self.head = self
                .closer
                .close(&self.head, data, &mut self.store, &self.history)
                .expect("close");
            self.head.clone()
        }
    }

    #[test]
    fn test_close_empty_batch() {
        let master = keypair(1);
        let mut h = Harness::new(&master, 1_000_000);
        let genesis_state_root = h.head.state_root();

        let closed = h.close(Vec::new());
        assert_eq!(closed.sequence(), GENESIS_SEQ + 1);
        assert_eq!(closed.tx_count(), 0);
        assert_eq!(
            closed.state_root(),
            genesis_state_root,
            "no transactions, no state change"
        );
        assert_ne!(closed.hash(), Hash256::ZERO);
    }

    #[test]
    fn test_close_is_deterministic() {
        let master = keypair(1);
        let recipients: Vec<SecretKey> = (10u8..16).map(keypair).collect();

        let run = || {
            let mut h = Harness::new(&master, 10_000_000);
            let txs: Vec<Transaction> = recipients
                .iter()
                .enumerate()
                .map(|(i, to)| pay(&master, to, i as u32 + 1, 50_000))
                .collect();
            h.close(txs).hash()
        };

        assert_eq!(run(), run(), "same parent and batch, same hash");
    }

    #[test]
    fn test_close_rejects_wrong_parent_hash() {
        let master = keypair(1);
        let mut h = Harness::new(&master, 1_000_000);

        let mut data = CloseData::new(Vec::new(), 1_000, &h.head);
        data.parent_hash = Hash256::hash(b"someone else");
        let err = h
            .closer
            .close(&h.head, data, &mut h.store, &h.history)
            .unwrap_err();
        assert!(matches!(err, LedgerError::HashMismatch { .. }));
    }

    #[test]
    fn test_close_rejects_wrong_batch_digest() {
        let master = keypair(1);
        let mut h = Harness::new(&master, 1_000_000);

        let tx = pay(&master, &keypair(9), 1, 1_000);
        let mut data = CloseData::new(vec![tx], 1_000, &h.head);
        data.set_hash = Hash256::hash(b"not the agreed set");
        let err = h
            .closer
            .close(&h.head, data, &mut h.store, &h.history)
            .unwrap_err();
        assert!(matches!(err, LedgerError::HashMismatch { .. }));
    }

    #[test]
    fn test_retry_converges_on_batch_internal_funding_chain() {
        let master = keypair(1);
        let alice = keypair(2);
        let bob = keypair(3);
        let carol = keypair(4);
        let mut h = Harness::new(&master, 100_000_000);

        // master funds alice, alice funds bob, bob funds carol; the
        // canonical order has no reason to match the dependency order,
        // and the retry loop must still converge.
        let batch = vec![
            pay(&bob, &carol, 1, 10_000),
            pay(&alice, &bob, 1, 50_000),
            pay(&master, &alice, 1, 200_000),
        ];
        let closed = h.close(batch.clone());

        assert_eq!(closed.tx_count(), 3, "all three settle within the bound");
        for tx in &batch {
            assert_eq!(
                closed.outcome(&tx.id()).map(|o| o.code),
                Some(ResultCode::Applied),
                "every link of the chain succeeds"
            );
        }
        let carol_root = closed.account(&carol.account_id()).unwrap().unwrap();
        assert_eq!(carol_root.balance, 10_000);
    }

    #[test]
    fn test_unresolvable_retries_are_dropped_uncharged() {
        let master = keypair(1);
        let ghost = keypair(7);
        let mut h = Harness::new(&master, 1_000_000);

        // ghost never gets funded; its payment can never settle.
        let doomed = pay(&ghost, &master, 1, 5_000);
        let funded = pay(&master, &keypair(8), 1, 5_000);
        let closed = h.close(vec![doomed.clone(), funded.clone()]);

        assert_eq!(closed.tx_count(), 1);
        assert!(closed.outcome(&doomed.id()).is_none(), "dropped, not recorded");
        assert!(closed.outcome(&funded.id()).is_some());
        assert!(
            closed.account(&ghost.account_id()).unwrap().is_none(),
            "nothing was charged to anyone for the dropped transaction"
        );
    }

    #[test]
    fn test_fees_destroy_drops() {
        let master = keypair(1);
        let mut h = Harness::new(&master, 1_000_000);
        let total_before = h.head.header().total_drops;

        let closed = h.close(vec![pay(&master, &keypair(9), 1, 5_000)]);
        assert_eq!(closed.header().total_drops, total_before - 100);

        // The amount itself only moved
        let master_root = closed.account(&master.account_id()).unwrap().unwrap();
        let dest_root = closed.account(&keypair(9).account_id()).unwrap().unwrap();
        assert_eq!(master_root.balance + dest_root.balance, total_before - 100);
    }

    #[test]
    fn test_close_time_is_rounded_to_resolution() {
        let master = keypair(1);
        let mut h = Harness::new(&master, 1_000_000);

        let mut data = CloseData::new(Vec::new(), 1_004, &h.head);
        data.close_time_resolution = 30;
        let closed = h
            .closer
            .close(&h.head, data, &mut h.store, &h.history)
            .unwrap();
        assert_eq!(closed.header().close_time, 990);
        assert!(closed.header().close_flag);
    }

    #[test]
    fn test_skip_list_growth() {
        let master = keypair(1);
        let mut h = Harness::new(&master, 1_000_000);

        // Close up to sequence 9; at sequence 9 the skip list covers
        // 2^0..2^3 (targets 8, 7, 5, 1).
        for _ in 0..8 {
            h.close(Vec::new());
        }
        let head = h.head.clone();
        assert_eq!(head.sequence(), 9);
        assert_eq!(head.skip_list().len(), 4);

        let parent = h.history.by_seq(8).unwrap();
        assert_eq!(head.skip_list()[0], parent.hash());
        let genesis = h.history.by_seq(GENESIS_SEQ).unwrap();
        assert_eq!(head.skip_list()[3], genesis.hash());
    }

    #[test]
    fn test_signature_checking_at_close() {
        let master = keypair(1);
        let mut h = Harness::new(&master, 1_000_000);

        let mut forged = pay(&master, &keypair(9), 1, 5_000);
        forged.fee = 5_000; // breaks the signature

        let data = CloseData::new(vec![forged.clone()], 1_000, &h.head);
        let closed = h
            .closer
            .close(&h.head, data, &mut h.store, &h.history)
            .unwrap();

        // Malformed: never recorded, nothing charged.
        assert_eq!(closed.tx_count(), 0);
        assert_eq!(
            closed.account(&master.account_id()).unwrap().unwrap().balance,
            1_000_000
        );
    }
}
