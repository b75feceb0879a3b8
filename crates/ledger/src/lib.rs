//! Ledger snapshots and the ledger close pipeline.
//!
//! This crate turns a closed parent ledger plus an agreed candidate
//! transaction batch into the next closed ledger, deterministically:
//! two nodes closing the same `(parent, batch)` produce byte-identical
//! ledger hashes.
//!
//! # Architecture
//!
//! - [`LedgerHeader`] / [`header`]: the sealed header fields and the
//!   hash chain over them
//! - [`ClosedLedger`]: an immutable snapshot — header, hash, skip list,
//!   frozen state and transaction trees, and per-transaction outcome
//!   records
//! - [`OpenLedger`]: the mutable scratchpad one close operation owns
//!   exclusively; a copy-on-write clone of the parent's state tree plus
//!   a fresh transaction tree
//! - [`CanonicalTxSet`]: the batch-salted strict total order
//!   transactions are attempted in
//! - [`LedgerCloser`]: the multi-pass apply loop and the sealing step
//! - [`LedgerHistory`]: the shared store of closed ledgers and the
//!   query surface (by sequence, by hash, ancestor lookup via skip
//!   list)
//!
//! # Close pipeline
//!
//! [`LedgerCloser::close`] validates the consensus-agreed inputs
//! against the parent (fatal on mismatch), applies the candidate batch
//! over as many passes as it takes retries to settle (bounded by
//! [`CloseConfig::max_apply_passes`]), then seals: dirty tree nodes are
//! flushed once, tagged with the new sequence, the roots and skip list
//! are computed, and the header hash fixes the ledger forever.

mod close;
mod header;
mod history;
mod snapshot;
mod tx_set;

pub use close::{CloseData, CloseConfig, LedgerCloser};
pub use header::{compute_header_hash, verify_header_chain, LedgerHeader};
pub use history::LedgerHistory;
pub use snapshot::{ClosedLedger, OpenLedger, GENESIS_SEQ};
pub use tx_set::{batch_digest, next_pass_salt, CanonicalTxSet};

use seiche_tree::TreeError;
use seiche_tx::TxError;
use thiserror::Error;

/// Fatal errors in ledger construction.
///
/// Per-transaction outcomes are never errors; anything surfacing here
/// aborts the closing operation before the ledger is published, since
/// continuing would risk divergence between nodes.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Consensus input targets a different sequence than the parent
    /// produces.
    #[error("invalid sequence: expected {expected}, got {actual}")]
    InvalidSequence { expected: u32, actual: u32 },

    /// A digest disagreed with its consensus-agreed expectation.
    #[error("hash mismatch: expected {expected}, actual {actual}")]
    HashMismatch { expected: String, actual: String },

    /// A skip-list target could not be resolved from history.
    #[error("missing ancestor at sequence {sequence}")]
    MissingAncestor { sequence: u32 },

    /// Fatal transaction-layer failure (state corruption).
    #[error(transparent)]
    Tx(#[from] TxError),

    /// Fatal tree-layer failure.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
