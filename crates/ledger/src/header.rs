//! Ledger header construction, hashing, and verification.
//!
//! Each closed ledger is identified by the SHA-256 hash of its
//! canonically encoded header. The header commits to the parent hash,
//! both tree roots, and the close metadata, so the hash chain covers
//! the entire ledger history and state.

use crate::{LedgerError, Result};
use seiche_common::{Hash256, WireWriter};

/// The fields sealed into a closed ledger's hash.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LedgerHeader {
    /// Ledger sequence, strictly increasing by 1 from the parent.
    pub sequence: u32,
    /// Hash of the previous closed ledger; zero for genesis.
    pub parent_hash: Hash256,
    /// Root digest of the account-state tree at close time.
    pub state_root: Hash256,
    /// Root digest of the transaction tree built for this ledger.
    pub tx_root: Hash256,
    /// Close time in seconds, rounded to `close_time_resolution`.
    pub close_time: u64,
    /// Granularity the close time was rounded to.
    pub close_time_resolution: u32,
    /// Whether participants agreed the close time is exact.
    pub close_flag: bool,
    /// Native drops in existence; fees destroy drops.
    pub total_drops: i64,
}

/// Compute the canonical hash of a ledger header.
///
/// This hash uniquely identifies the ledger: it is what the next ledger
/// records as its parent and what the skip list stores for ancestors.
pub fn compute_header_hash(header: &LedgerHeader) -> Hash256 {
    let mut w = WireWriter::new();
    w.put_bytes(b"ldgr");
    w.put_u32(header.sequence);
    w.put_hash(&header.parent_hash);
    w.put_hash(&header.state_root);
    w.put_hash(&header.tx_root);
    w.put_u64(header.close_time);
    w.put_u32(header.close_time_resolution);
    w.put_bool(header.close_flag);
    w.put_i64(header.total_drops);
    Hash256::hash(w.as_slice())
}

/// Verify that a header correctly chains to its predecessor.
///
/// # Errors
///
/// - [`LedgerError::InvalidSequence`] if the sequences are not
///   consecutive
/// - [`LedgerError::HashMismatch`] if `current.parent_hash` is not the
///   hash of `prev`
pub fn verify_header_chain(
    prev: &LedgerHeader,
    prev_hash: &Hash256,
    current: &LedgerHeader,
) -> Result<()> {
    let expected_seq = prev.sequence + 1;
    if current.sequence != expected_seq {
        return Err(LedgerError::InvalidSequence {
            expected: expected_seq,
            actual: current.sequence,
        });
    }

    if current.parent_hash != *prev_hash {
        return Err(LedgerError::HashMismatch {
            expected: prev_hash.to_hex(),
            actual: current.parent_hash.to_hex(),
        });
    }

    Ok(())
}
