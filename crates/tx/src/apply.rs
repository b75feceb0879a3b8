//! The transaction applier.
//!
//! [`apply`] validates one transaction against a mutable state view and
//! commits its effects. Validation runs in a fixed order: signature and
//! authorization, static shape checks, source account existence,
//! sequence match, fee affordability, then kind-specific rules. The
//! first check that fails decides the outcome.
//!
//! # Atomicity
//!
//! Nothing is written to the view until the outcome is known.
//! Kind-specific handlers stage their writes; the commit step then
//! writes either the full effect (Success), only the fee and sequence
//! consumption (Failure in closed mode), or nothing at all (Retry,
//! Malformed). A transaction can never leave a partial effect behind.
//!
//! # Open-ledger mode
//!
//! With [`ApplyFlags::open_ledger`] set, would-be Failure outcomes are
//! reported but not committed: the speculative open ledger does not burn
//! fees on transactions whose fate consensus has not fixed yet. At close
//! time the closer applies in closed mode, where Failure charges the fee
//! and consumes the sequence number exactly once.

use seiche_common::{quality, AccountId, Amount, Asset, Currency, Hash256};
use tracing::debug;

use crate::entry::{AccountRoot, LedgerEntry, OfferEntry, TrustLineEntry, ACCOUNT_FLAGS_MASK};
use crate::keys::{account_index, offer_index, trustline_index};
use crate::model::{Transaction, TxKind, MIN_TX_FEE};
use crate::result::ResultCode;
use crate::{Result, TxError};

/// Mutable view of the working account-state tree.
///
/// The applier reads and writes entries through this seam; the open
/// ledger implements it over its copy-on-write state tree and stamps
/// each written entry with the closing sequence number.
pub trait StateView {
    /// Fetch and decode the entry at `key`.
    fn entry(&self, key: &Hash256) -> Result<Option<LedgerEntry>>;

    /// Insert or replace the entry at `key`.
    fn put_entry(&mut self, key: Hash256, entry: LedgerEntry);

    /// Remove the entry at `key`. Returns whether it existed.
    fn remove_entry(&mut self, key: &Hash256) -> bool;
}

/// Application mode flags.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApplyFlags {
    /// Speculative open-ledger mode: Failure outcomes are reported but
    /// not committed (no fee burned, no sequence consumed).
    pub open_ledger: bool,
    /// Skip the signature/authorization check. Only for controlled or
    /// test contexts; the check is otherwise mandatory and runs before
    /// all other validation.
    pub skip_signature_check: bool,
}

/// A staged write: an entry to store, or `None` to delete the key.
type Write = (Hash256, Option<LedgerEntry>);

/// Outcome of a kind-specific handler, before commit.
enum KindOutcome {
    /// Effect computed; commit these writes plus the staged source
    /// account.
    Success(Vec<Write>),
    /// Well-formed but cannot take effect; commit fee and sequence only.
    Fail(ResultCode),
}

use KindOutcome::{Fail, Success};

/// Apply one transaction to the working state.
///
/// Returns the result code and whether the transaction was applied
/// (fee charged, sequence consumed, outcome to be recorded). Retry and
/// Malformed outcomes never report `applied`.
///
/// # Errors
///
/// Only fatal conditions — undecodable state entries, an index holding
/// the wrong entry family — return `Err`. Every per-transaction verdict
/// is a [`ResultCode`].
pub fn apply(
    view: &mut dyn StateView,
    tx: &Transaction,
    flags: ApplyFlags,
) -> Result<(ResultCode, bool)> {
    let (code, applied) = apply_inner(view, tx, flags)?;
    debug!(
        account = %tx.account,
        sequence = tx.sequence,
        code = ?code,
        applied,
        "transaction applied"
    );
    Ok((code, applied))
}

fn apply_inner(
    view: &mut dyn StateView,
    tx: &Transaction,
    flags: ApplyFlags,
) -> Result<(ResultCode, bool)> {
    // Signature and authorization precede everything else.
    if !flags.skip_signature_check && !tx.verify_signature() {
        return Ok((ResultCode::BadSignature, false));
    }

    // Static shape checks need no state.
    if let Some(code) = preflight(tx) {
        return Ok((code, false));
    }

    let source_key = account_index(&tx.account);
    let source = match view.entry(&source_key)? {
        None => return Ok((ResultCode::NoSourceAccount, false)),
        Some(LedgerEntry::Account(account)) => account,
        Some(other) => {
            return Err(TxError::State(format!(
                "account index {source_key} holds {other:?}"
            )))
        }
    };

    if tx.sequence < source.sequence {
        return Ok((ResultCode::PastSequence, false));
    }
    if tx.sequence > source.sequence {
        return Ok((ResultCode::FutureSequence, false));
    }

    if source.balance < tx.fee {
        return Ok((ResultCode::FeeUnfunded, false));
    }

    // Fee and sequence consumption, staged. Committed for every applied
    // outcome, effect or not.
    let mut fee_account = source.clone();
    fee_account.balance -= tx.fee;
    fee_account.sequence += 1;

    // The handler mutates its own copy; a failing handler cannot leak
    // partial source-account changes into the fee-only commit.
    let mut staged = fee_account.clone();
    let outcome = match &tx.kind {
        TxKind::Payment {
            destination,
            amount,
        } => apply_payment(&*view, tx, &mut staged, destination, amount)?,
        TxKind::TrustSet { limit, flags } => apply_trust_set(&*view, tx, &mut staged, limit, *flags)?,
        TxKind::AccountSet {
            set_flags,
            clear_flags,
        } => {
            staged.flags = (staged.flags | set_flags) & !clear_flags;
            Success(Vec::new())
        }
        TxKind::OfferCreate {
            taker_pays,
            taker_gets,
        } => apply_offer_create(&*view, tx, &mut staged, taker_pays, taker_gets)?,
        TxKind::OfferCancel { offer_sequence } => {
            apply_offer_cancel(&*view, tx, &mut staged, *offer_sequence)?
        }
    };

    match outcome {
        Success(writes) => {
            for (key, write) in writes {
                match write {
                    Some(entry) => view.put_entry(key, entry),
                    None => {
                        view.remove_entry(&key);
                    }
                }
            }
            view.put_entry(source_key, LedgerEntry::Account(staged));
            Ok((ResultCode::Applied, true))
        }
        Fail(code) => {
            if flags.open_ledger {
                // Speculative ledger: report without charging.
                Ok((code, false))
            } else {
                view.put_entry(source_key, LedgerEntry::Account(fee_account));
                Ok((code, true))
            }
        }
    }
}

/// Stateless shape validation. Returns the malformed code, if any.
fn preflight(tx: &Transaction) -> Option<ResultCode> {
    if tx.fee < MIN_TX_FEE {
        return Some(ResultCode::BadFee);
    }
    match &tx.kind {
        TxKind::Payment {
            destination,
            amount,
        } => {
            if !amount.is_positive() {
                return Some(ResultCode::BadAmount);
            }
            if *destination == tx.account {
                return Some(ResultCode::SelfPayment);
            }
        }
        TxKind::TrustSet { limit, .. } => {
            let Asset::Issued { issuer, .. } = limit.asset else {
                return Some(ResultCode::BadAmount);
            };
            if limit.value < 0 {
                return Some(ResultCode::BadAmount);
            }
            if issuer == tx.account {
                return Some(ResultCode::SelfPayment);
            }
        }
        TxKind::AccountSet {
            set_flags,
            clear_flags,
        } => {
            if set_flags & !ACCOUNT_FLAGS_MASK != 0 || clear_flags & !ACCOUNT_FLAGS_MASK != 0 {
                return Some(ResultCode::BadFlags);
            }
            if set_flags & clear_flags != 0 {
                return Some(ResultCode::BadFlags);
            }
        }
        TxKind::OfferCreate {
            taker_pays,
            taker_gets,
        } => {
            if !taker_pays.is_positive() || !taker_gets.is_positive() {
                return Some(ResultCode::BadAmount);
            }
            if taker_pays.asset == taker_gets.asset {
                return Some(ResultCode::BadOffer);
            }
        }
        TxKind::OfferCancel { offer_sequence } => {
            if *offer_sequence == 0 || *offer_sequence >= tx.sequence {
                return Some(ResultCode::BadOffer);
            }
        }
    }
    None
}

fn load_account(view: &dyn StateView, id: &AccountId) -> Result<Option<AccountRoot>> {
    match view.entry(&account_index(id))? {
        None => Ok(None),
        Some(LedgerEntry::Account(account)) => Ok(Some(account)),
        Some(other) => Err(TxError::State(format!(
            "account index for {id} holds {other:?}"
        ))),
    }
}

fn load_trustline(
    view: &dyn StateView,
    a: &AccountId,
    b: &AccountId,
    currency: &Currency,
) -> Result<Option<TrustLineEntry>> {
    match view.entry(&trustline_index(a, b, currency))? {
        None => Ok(None),
        Some(LedgerEntry::TrustLine(line)) => Ok(Some(line)),
        Some(other) => Err(TxError::State(format!(
            "trust line index holds {other:?}"
        ))),
    }
}

/// A globally frozen issuer blocks third-party movement of its issues.
/// The issuer itself may still issue, and holders may still redeem
/// directly to the issuer.
fn frozen_blocks(
    view: &dyn StateView,
    issuer: &AccountId,
    source: &AccountId,
    destination: &AccountId,
) -> Result<bool> {
    if source == issuer || destination == issuer {
        return Ok(false);
    }
    match load_account(view, issuer)? {
        Some(issuer_account) => Ok(issuer_account.is_globally_frozen()),
        None => Ok(false),
    }
}

fn apply_payment(
    view: &dyn StateView,
    tx: &Transaction,
    staged: &mut AccountRoot,
    destination: &AccountId,
    amount: &Amount,
) -> Result<KindOutcome> {
    match amount.asset {
        Asset::Native => {
            if staged.balance < amount.value {
                return Ok(Fail(ResultCode::Unfunded));
            }
            staged.balance -= amount.value;

            let dest_key = account_index(destination);
            let dest_entry = match load_account(view, destination)? {
                Some(mut dest) => {
                    dest.balance += amount.value;
                    dest
                }
                // Native payments to a missing account create it.
                None => AccountRoot::new(*destination, amount.value),
            };
            Ok(Success(vec![(
                dest_key,
                Some(LedgerEntry::Account(dest_entry)),
            )]))
        }
        Asset::Issued { currency, issuer } => {
            if frozen_blocks(view, &issuer, &tx.account, destination)? {
                return Ok(Fail(ResultCode::Frozen));
            }

            if tx.account == issuer {
                // Issue: credit the destination's line with the issuer.
                if load_account(view, destination)?.is_none() {
                    return Ok(Fail(ResultCode::NoDestination));
                }
                let Some(mut line) = load_trustline(view, destination, &issuer, &currency)? else {
                    return Ok(Fail(ResultCode::NoTrustLine));
                };
                let holding = line.holding_of(destination);
                if holding
                    .checked_add(amount.value)
                    .map_or(true, |total| total > line.limit_of(destination))
                {
                    return Ok(Fail(ResultCode::LimitExceeded));
                }
                line.credit(destination, amount.value);
                let key = trustline_index(destination, &issuer, &currency);
                Ok(Success(vec![(key, Some(LedgerEntry::TrustLine(line)))]))
            } else if *destination == issuer {
                // Redeem: return held issue to the issuer.
                let Some(mut line) = load_trustline(view, &tx.account, &issuer, &currency)? else {
                    return Ok(Fail(ResultCode::NoTrustLine));
                };
                if line.holding_of(&tx.account) < amount.value {
                    return Ok(Fail(ResultCode::Unfunded));
                }
                line.credit(&tx.account, -amount.value);
                let key = trustline_index(&tx.account, &issuer, &currency);
                Ok(Success(vec![(key, Some(LedgerEntry::TrustLine(line)))]))
            } else {
                // Third party: move the holding through the issuer.
                let Some(mut source_line) = load_trustline(view, &tx.account, &issuer, &currency)?
                else {
                    return Ok(Fail(ResultCode::NoTrustLine));
                };
                if source_line.holding_of(&tx.account) < amount.value {
                    return Ok(Fail(ResultCode::Unfunded));
                }
                if load_account(view, destination)?.is_none() {
                    return Ok(Fail(ResultCode::NoDestination));
                }
                let Some(mut dest_line) = load_trustline(view, destination, &issuer, &currency)?
                else {
                    return Ok(Fail(ResultCode::NoTrustLine));
                };
                let holding = dest_line.holding_of(destination);
                if holding
                    .checked_add(amount.value)
                    .map_or(true, |total| total > dest_line.limit_of(destination))
                {
                    return Ok(Fail(ResultCode::LimitExceeded));
                }

                source_line.credit(&tx.account, -amount.value);
                dest_line.credit(destination, amount.value);
                Ok(Success(vec![
                    (
                        trustline_index(&tx.account, &issuer, &currency),
                        Some(LedgerEntry::TrustLine(source_line)),
                    ),
                    (
                        trustline_index(destination, &issuer, &currency),
                        Some(LedgerEntry::TrustLine(dest_line)),
                    ),
                ]))
            }
        }
    }
}

fn apply_trust_set(
    view: &dyn StateView,
    tx: &Transaction,
    staged: &mut AccountRoot,
    limit: &Amount,
    line_flags: u32,
) -> Result<KindOutcome> {
    let Asset::Issued { currency, issuer } = limit.asset else {
        // Preflight already rejected this shape.
        return Ok(Fail(ResultCode::BadAmount));
    };

    if load_account(view, &issuer)?.is_none() {
        return Ok(Fail(ResultCode::NoDestination));
    }

    let key = trustline_index(&tx.account, &issuer, &currency);
    let existing = load_trustline(view, &tx.account, &issuer, &currency)?;
    let created = existing.is_none();

    let mut line = existing
        .unwrap_or_else(|| TrustLineEntry::new(tx.account, issuer, currency));
    line.set_limit_of(&tx.account, limit.value);
    line.flags |= line_flags;

    if line.is_default() {
        // Clearing an existing line removes it from the state tree.
        if created {
            return Ok(Success(Vec::new()));
        }
        staged.owner_count = staged.owner_count.saturating_sub(1);
        return Ok(Success(vec![(key, None)]));
    }

    if created {
        staged.owner_count += 1;
    }
    Ok(Success(vec![(key, Some(LedgerEntry::TrustLine(line)))]))
}

fn apply_offer_create(
    view: &dyn StateView,
    tx: &Transaction,
    staged: &mut AccountRoot,
    taker_pays: &Amount,
    taker_gets: &Amount,
) -> Result<KindOutcome> {
    let offer_rate = quality::rate(taker_pays, taker_gets);
    if !quality::is_valid_quality(offer_rate) {
        return Ok(Fail(ResultCode::BadOffer));
    }

    // The offer must be funded: the account gives `taker_gets`.
    match taker_gets.asset {
        Asset::Native => {
            if staged.balance < taker_gets.value {
                return Ok(Fail(ResultCode::Unfunded));
            }
        }
        Asset::Issued { currency, issuer } => {
            if issuer != tx.account {
                if frozen_blocks(view, &issuer, &tx.account, &tx.account)? {
                    return Ok(Fail(ResultCode::Frozen));
                }
                let Some(line) = load_trustline(view, &tx.account, &issuer, &currency)? else {
                    return Ok(Fail(ResultCode::NoTrustLine));
                };
                if line.holding_of(&tx.account) < taker_gets.value {
                    return Ok(Fail(ResultCode::Unfunded));
                }
            }
        }
    }

    let base = quality::book_base(&taker_pays.asset, &taker_gets.asset);
    let offer = OfferEntry {
        account: tx.account,
        sequence: tx.sequence,
        taker_pays: *taker_pays,
        taker_gets: *taker_gets,
        book_index: quality::index_with_quality(&base, offer_rate),
        modified_seq: 0,
    };
    staged.owner_count += 1;
    Ok(Success(vec![(
        offer_index(&tx.account, tx.sequence),
        Some(LedgerEntry::Offer(offer)),
    )]))
}

fn apply_offer_cancel(
    view: &dyn StateView,
    tx: &Transaction,
    staged: &mut AccountRoot,
    offer_sequence: u32,
) -> Result<KindOutcome> {
    let key = offer_index(&tx.account, offer_sequence);
    match view.entry(&key)? {
        Some(LedgerEntry::Offer(_)) => {
            staged.owner_count = staged.owner_count.saturating_sub(1);
            Ok(Success(vec![(key, None)]))
        }
        Some(other) => Err(TxError::State(format!("offer index holds {other:?}"))),
        // Cancelling a missing offer succeeds without effect.
        None => Ok(Success(Vec::new())),
    }
}
