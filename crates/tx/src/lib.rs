//! Transaction model and applier for the seiche ledger engine.
//!
//! This crate defines everything that moves through a ledger close:
//!
//! - [`Transaction`] / [`TxKind`]: the signed transaction envelope and
//!   the operations it can carry (payments, trust lines, account flags,
//!   offers)
//! - [`entry`]: the ledger-entry types held in the account-state tree,
//!   with their canonical encodings
//! - [`keys`]: derivation of the 256-bit state-tree indexes entries live
//!   under
//! - [`ResultCode`] / [`ResultClass`]: the outcome taxonomy — Success,
//!   Failure (fee charged, effect withheld), Retry (reconsider next
//!   pass), Malformed (rejected outright)
//! - [`apply`]: the applier, which validates one transaction against a
//!   mutable state view and commits its effects atomically
//!
//! # Outcomes are values
//!
//! A transaction that fails is not an error: Failure, Retry, and
//! Malformed are ordinary [`ResultCode`] values the ledger closer
//! routes. [`TxError`] is reserved for fatal conditions — corrupted
//! state bytes, unknown stored codes — where continuing would risk
//! divergence between nodes.

pub mod apply;
pub mod entry;
pub mod keys;
pub mod model;
pub mod result;

pub use apply::{apply, ApplyFlags, StateView};
pub use entry::{AccountRoot, LedgerEntry, OfferEntry, TrustLineEntry, ACCOUNT_FLAG_GLOBAL_FREEZE};
pub use model::{Transaction, TxKind, MIN_TX_FEE};
pub use result::{ResultClass, ResultCode, TxOutcome};

use seiche_common::WireError;
use thiserror::Error;

/// Fatal errors in transaction processing.
///
/// These abort the surrounding ledger close; per-transaction outcomes
/// are [`ResultCode`]s, not errors.
#[derive(Debug, Error)]
pub enum TxError {
    /// Stored entry bytes failed to decode.
    #[error("state entry decode failed: {0}")]
    Wire(#[from] WireError),

    /// A stored result code byte had no defined meaning.
    #[error("unknown result code {0:#04x}")]
    UnknownResultCode(u8),

    /// State access failed in the backing view.
    #[error("state access failed: {0}")]
    State(String),
}

/// Result type for transaction operations.
pub type Result<T> = std::result::Result<T, TxError>;
