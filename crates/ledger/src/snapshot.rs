//! Open and closed ledger snapshots.
//!
//! A [`ClosedLedger`] is immutable: its hash is fixed, its trees are
//! frozen, and concurrent readers can share it freely. An
//! [`OpenLedger`] is the mutable scratchpad exactly one closing
//! operation owns while applying a transaction batch; it deliberately
//! has no hash accessor, because a ledger's hash does not exist until
//! it is sealed.

use crate::header::{compute_header_hash, LedgerHeader};
use crate::{LedgerError, Result};
use seiche_common::time::DEFAULT_CLOSE_TIME_RESOLUTION;
use seiche_common::{AccountId, Hash256, WireReader, WireWriter};
use seiche_tree::{MerkleMap, NodeKind, NodeStore};
use seiche_tx::keys::account_index;
use seiche_tx::{AccountRoot, LedgerEntry, ResultCode, StateView, Transaction, TxOutcome};
use std::collections::HashMap;

/// Sequence number of a genesis ledger.
pub const GENESIS_SEQ: u32 = 1;

/// An immutable closed ledger.
///
/// Everything reachable from here is frozen: the header, the hash, the
/// skip list, both trees, and the outcome records. Sharing a closed
/// ledger across threads for reading is safe by construction.
#[derive(Clone, Debug)]
pub struct ClosedLedger {
    pub(crate) header: LedgerHeader,
    pub(crate) hash: Hash256,
    /// Entry `i` holds the hash of the ancestor at `sequence - 2^i`.
    pub(crate) skip_list: Vec<Hash256>,
    pub(crate) state_tree: MerkleMap,
    pub(crate) tx_tree: MerkleMap,
    pub(crate) outcomes: HashMap<Hash256, TxOutcome>,
}

impl ClosedLedger {
    /// Construct a genesis ledger from an explicit initial allocation.
    ///
    /// The ledger funds `master` with `starting_drops`, carries no
    /// transactions, and chains from the zero hash. Its state nodes are
    /// flushed to `store` under [`GENESIS_SEQ`].
    pub fn genesis(master: AccountId, starting_drops: i64, store: &mut dyn NodeStore) -> Self {
        let mut state_tree = MerkleMap::new();
        let mut root = AccountRoot::new(master, starting_drops);
        root.modified_seq = GENESIS_SEQ;
        state_tree.insert(
            account_index(&master),
            LedgerEntry::Account(root).to_bytes(),
        );
        state_tree.flush_dirty(store, NodeKind::AccountState, GENESIS_SEQ);

        let header = LedgerHeader {
            sequence: GENESIS_SEQ,
            parent_hash: Hash256::ZERO,
            state_root: state_tree.root_hash(),
            tx_root: Hash256::ZERO,
            close_time: 0,
            close_time_resolution: DEFAULT_CLOSE_TIME_RESOLUTION,
            close_flag: true,
            total_drops: starting_drops,
        };
        let hash = compute_header_hash(&header);

        Self {
            header,
            hash,
            skip_list: Vec::new(),
            state_tree,
            tx_tree: MerkleMap::new(),
            outcomes: HashMap::new(),
        }
    }

    pub fn header(&self) -> &LedgerHeader {
        &self.header
    }

    /// The sealed ledger hash.
    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    pub fn sequence(&self) -> u32 {
        self.header.sequence
    }

    pub fn parent_hash(&self) -> Hash256 {
        self.header.parent_hash
    }

    pub fn state_root(&self) -> Hash256 {
        self.header.state_root
    }

    /// Sparse ancestor hashes: entry `i` points `2^i` ledgers back.
    pub fn skip_list(&self) -> &[Hash256] {
        &self.skip_list
    }

    /// Number of transactions recorded in this ledger.
    pub fn tx_count(&self) -> usize {
        self.outcomes.len()
    }

    /// Fetch and decode the state entry at `key`, as of this ledger.
    pub fn state_entry(&self, key: &Hash256) -> Result<Option<LedgerEntry>> {
        match self.state_tree.get(key) {
            Some(bytes) => Ok(Some(LedgerEntry::from_bytes(bytes).map_err(LedgerError::Tx)?)),
            None => Ok(None),
        }
    }

    /// Fetch an account root, as of this ledger.
    pub fn account(&self, account: &AccountId) -> Result<Option<AccountRoot>> {
        match self.state_entry(&account_index(account))? {
            Some(LedgerEntry::Account(root)) => Ok(Some(root)),
            Some(other) => Err(LedgerError::Tx(seiche_tx::TxError::State(format!(
                "account index holds {other:?}"
            )))),
            None => Ok(None),
        }
    }

    /// The recorded outcome of an included transaction.
    pub fn outcome(&self, tx_id: &Hash256) -> Option<&TxOutcome> {
        self.outcomes.get(tx_id)
    }

    /// Decode the full record of an included transaction from the
    /// transaction tree: the original envelope plus its outcome.
    pub fn recorded_transaction(&self, tx_id: &Hash256) -> Result<Option<(Transaction, TxOutcome)>> {
        let Some(bytes) = self.tx_tree.get(tx_id) else {
            return Ok(None);
        };
        let mut r = WireReader::new(bytes);
        let tx_bytes = r.get_var_bytes().map_err(seiche_tx::TxError::Wire)?;
        let tx = Transaction::from_bytes(tx_bytes).map_err(LedgerError::Tx)?;
        let code = ResultCode::from_u8(r.get_u8().map_err(seiche_tx::TxError::Wire)?)?;
        let fee_charged = r.get_i64().map_err(seiche_tx::TxError::Wire)?;
        r.finish().map_err(seiche_tx::TxError::Wire)?;
        Ok(Some((tx, TxOutcome { code, fee_charged })))
    }
}

/// The mutable scratchpad for one in-progress close.
///
/// Created as a copy-on-write child of a closed parent: the state tree
/// shares every node with the parent until a transaction touches it,
/// and the transaction tree starts empty. Exactly one closing operation
/// owns an open ledger; it is consumed by sealing.
pub struct OpenLedger {
    pub(crate) sequence: u32,
    pub(crate) parent_hash: Hash256,
    pub(crate) total_drops: i64,
    pub(crate) state_tree: MerkleMap,
    pub(crate) tx_tree: MerkleMap,
    pub(crate) fees_destroyed: i64,
    pub(crate) outcomes: HashMap<Hash256, TxOutcome>,
}

impl OpenLedger {
    /// Open a mutable child of `parent`.
    pub fn from_parent(parent: &ClosedLedger) -> Self {
        Self {
            sequence: parent.sequence() + 1,
            parent_hash: parent.hash(),
            total_drops: parent.header.total_drops,
            state_tree: parent.state_tree.clone(),
            tx_tree: MerkleMap::new(),
            fees_destroyed: 0,
            outcomes: HashMap::new(),
        }
    }

    /// The sequence this ledger will close as.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn parent_hash(&self) -> Hash256 {
        self.parent_hash
    }

    /// Record an applied transaction into the transaction tree with its
    /// outcome metadata.
    pub(crate) fn record_outcome(&mut self, tx: &Transaction, outcome: TxOutcome) {
        let id = tx.id();
        let mut w = WireWriter::new();
        w.put_var_bytes(&tx.to_bytes());
        w.put_u8(outcome.code.to_u8());
        w.put_i64(outcome.fee_charged);
        self.tx_tree.insert(id, w.into_bytes());
        self.outcomes.insert(id, outcome);
        self.fees_destroyed += outcome.fee_charged;
    }
}

impl StateView for OpenLedger {
    fn entry(&self, key: &Hash256) -> seiche_tx::Result<Option<LedgerEntry>> {
        match self.state_tree.get(key) {
            Some(bytes) => Ok(Some(LedgerEntry::from_bytes(bytes)?)),
            None => Ok(None),
        }
    }

    fn put_entry(&mut self, key: Hash256, mut entry: LedgerEntry) {
        entry.set_modified_seq(self.sequence);
        self.state_tree.insert(key, entry.to_bytes());
    }

    fn remove_entry(&mut self, key: &Hash256) -> bool {
        self.state_tree.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seiche_common::Amount;
    use seiche_crypto::SecretKey;
    use seiche_tree::MemoryNodeStore;
    use seiche_tx::{apply, ApplyFlags, TxKind};

    fn master() -> SecretKey {
        SecretKey::from_seed([1u8; 32])
    }

    #[test]
    fn test_genesis_ledger() {
        let mut store = MemoryNodeStore::new();
        let genesis = ClosedLedger::genesis(master().account_id(), 100_000, &mut store);

        assert_eq!(genesis.sequence(), GENESIS_SEQ);
        assert_eq!(genesis.parent_hash(), Hash256::ZERO);
        assert!(genesis.skip_list().is_empty());
        assert_eq!(genesis.tx_count(), 0);
        assert!(!genesis.hash().is_zero());

        let root = genesis.account(&master().account_id()).unwrap().unwrap();
        assert_eq!(root.balance, 100_000);
        assert_eq!(root.sequence, 1);

        // Genesis state nodes are flushed
        assert!(store.contains(&genesis.state_root()));
    }

    #[test]
    fn test_genesis_is_deterministic() {
        let mut store_a = MemoryNodeStore::new();
        let mut store_b = MemoryNodeStore::new();
        let a = ClosedLedger::genesis(master().account_id(), 100_000, &mut store_a);
        let b = ClosedLedger::genesis(master().account_id(), 100_000, &mut store_b);
        assert_eq!(a.hash(), b.hash());

        let c = ClosedLedger::genesis(master().account_id(), 100_001, &mut store_b);
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn test_open_ledger_leaves_parent_untouched() {
        let mut store = MemoryNodeStore::new();
        let genesis = ClosedLedger::genesis(master().account_id(), 100_000, &mut store);
        let parent_root = genesis.state_root();

        let mut open = OpenLedger::from_parent(&genesis);
        assert_eq!(open.sequence(), GENESIS_SEQ + 1);
        assert_eq!(open.parent_hash(), genesis.hash());

        let recipient = SecretKey::from_seed([2u8; 32]);
        let tx = Transaction::signed(
            &master(),
            1,
            100,
            TxKind::Payment {
                destination: recipient.account_id(),
                amount: Amount::drops(5_000),
            },
        );
        let (code, applied) = apply(&mut open, &tx, ApplyFlags::default()).unwrap();
        assert_eq!(code, ResultCode::Applied);
        assert!(applied);

        // Parent snapshot is untouched by child mutation
        assert_eq!(genesis.state_root(), parent_root);
        assert_eq!(
            genesis
                .account(&master().account_id())
                .unwrap()
                .unwrap()
                .balance,
            100_000
        );
        assert!(genesis
            .account(&recipient.account_id())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_written_entries_are_stamped_with_sequence() {
        let mut store = MemoryNodeStore::new();
        let genesis = ClosedLedger::genesis(master().account_id(), 100_000, &mut store);
        let mut open = OpenLedger::from_parent(&genesis);

        let recipient = SecretKey::from_seed([2u8; 32]).account_id();
        let mut entry = LedgerEntry::Account(AccountRoot::new(recipient, 42));
        entry.set_modified_seq(9999); // will be overwritten by the view
        open.put_entry(account_index(&recipient), entry);

        let stored = open.entry(&account_index(&recipient)).unwrap().unwrap();
        assert_eq!(stored.as_account().unwrap().modified_seq, open.sequence());
    }
}
