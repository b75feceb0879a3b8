//! Ledger entry types.
//!
//! Entries are the values stored in the account-state tree. Each entry
//! records the ledger sequence that last touched it and serializes to
//! canonical bytes via [`LedgerEntry::to_bytes`]; those bytes are what
//! the state tree's root digest commits over.

use crate::Result;
use seiche_common::{AccountId, Amount, Currency, Hash256, WireError, WireReader, WireWriter};

/// Account flag: no issued balance of this account's currencies may
/// move, except back to the issuer itself.
pub const ACCOUNT_FLAG_GLOBAL_FREEZE: u32 = 0x0000_0001;

/// Mask of all defined account flags.
pub const ACCOUNT_FLAGS_MASK: u32 = ACCOUNT_FLAG_GLOBAL_FREEZE;

const ACCOUNT_TAG: u8 = 0x01;
const TRUSTLINE_TAG: u8 = 0x02;
const OFFER_TAG: u8 = 0x03;

/// An account's root entry.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AccountRoot {
    pub account: AccountId,
    /// Native balance in drops.
    pub balance: i64,
    /// The next valid transaction sequence for this account.
    pub sequence: u32,
    /// Account flags, see [`ACCOUNT_FLAG_GLOBAL_FREEZE`].
    pub flags: u32,
    /// Number of owned objects (trust lines, offers) in the state tree.
    pub owner_count: u32,
    /// Ledger sequence that last modified this entry.
    pub modified_seq: u32,
}

impl AccountRoot {
    /// A freshly created account holding `balance` drops.
    pub fn new(account: AccountId, balance: i64) -> Self {
        Self {
            account,
            balance,
            sequence: 1,
            flags: 0,
            owner_count: 0,
            modified_seq: 0,
        }
    }

    pub fn is_globally_frozen(&self) -> bool {
        self.flags & ACCOUNT_FLAG_GLOBAL_FREEZE != 0
    }
}

/// A trust line between two accounts for one currency.
///
/// The endpoints are stored canonically ordered. The balance is from the
/// low account's perspective: positive means the low account holds that
/// much of the high account's issue, negative the reverse. Each side
/// sets its own limit on how much of the other's issue it will hold.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TrustLineEntry {
    pub low: AccountId,
    pub high: AccountId,
    pub currency: Currency,
    /// Issued balance from the low account's perspective.
    pub balance: i64,
    /// How much of high's issue the low account will hold.
    pub low_limit: i64,
    /// How much of low's issue the high account will hold.
    pub high_limit: i64,
    pub flags: u32,
    pub modified_seq: u32,
}

impl TrustLineEntry {
    /// An empty line between `a` and `b`, endpoints ordered canonically.
    pub fn new(a: AccountId, b: AccountId, currency: Currency) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            low,
            high,
            currency,
            balance: 0,
            low_limit: 0,
            high_limit: 0,
            flags: 0,
            modified_seq: 0,
        }
    }

    /// How much of the counterparty's issue `account` currently holds.
    pub fn holding_of(&self, account: &AccountId) -> i64 {
        if *account == self.low {
            self.balance
        } else {
            -self.balance
        }
    }

    /// The holding limit `account` has set for itself.
    pub fn limit_of(&self, account: &AccountId) -> i64 {
        if *account == self.low {
            self.low_limit
        } else {
            self.high_limit
        }
    }

    /// Set the holding limit for `account`'s side of the line.
    pub fn set_limit_of(&mut self, account: &AccountId, limit: i64) {
        if *account == self.low {
            self.low_limit = limit;
        } else {
            self.high_limit = limit;
        }
    }

    /// Credit `amount` to `account`'s holding (debit with a negative
    /// amount).
    pub fn credit(&mut self, account: &AccountId, amount: i64) {
        if *account == self.low {
            self.balance += amount;
        } else {
            self.balance -= amount;
        }
    }

    /// A line with no balance and no limits carries no information and
    /// can be removed from the state tree.
    pub fn is_default(&self) -> bool {
        self.balance == 0 && self.low_limit == 0 && self.high_limit == 0 && self.flags == 0
    }
}

/// An order-book offer.
///
/// The offer's position in its book is carried by `book_index`, whose
/// trailing 8 bytes encode the offer's rate (see
/// [`seiche_common::quality`]). Matching happens outside this engine;
/// placement and cancellation are what the applier handles.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OfferEntry {
    pub account: AccountId,
    /// The transaction sequence that created the offer.
    pub sequence: u32,
    pub taker_pays: Amount,
    pub taker_gets: Amount,
    /// Book directory index: pair base plus encoded rate.
    pub book_index: Hash256,
    pub modified_seq: u32,
}

/// A value stored in the account-state tree.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LedgerEntry {
    Account(AccountRoot),
    TrustLine(TrustLineEntry),
    Offer(OfferEntry),
}

impl LedgerEntry {
    /// Stamp the ledger sequence that is modifying this entry.
    pub fn set_modified_seq(&mut self, seq: u32) {
        match self {
            LedgerEntry::Account(a) => a.modified_seq = seq,
            LedgerEntry::TrustLine(t) => t.modified_seq = seq,
            LedgerEntry::Offer(o) => o.modified_seq = seq,
        }
    }

    /// Canonical bytes, the exact value the state tree commits over.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        match self {
            LedgerEntry::Account(a) => {
                w.put_u8(ACCOUNT_TAG);
                w.put_account(&a.account);
                w.put_i64(a.balance);
                w.put_u32(a.sequence);
                w.put_u32(a.flags);
                w.put_u32(a.owner_count);
                w.put_u32(a.modified_seq);
            }
            LedgerEntry::TrustLine(t) => {
                w.put_u8(TRUSTLINE_TAG);
                w.put_account(&t.low);
                w.put_account(&t.high);
                w.put_currency(&t.currency);
                w.put_i64(t.balance);
                w.put_i64(t.low_limit);
                w.put_i64(t.high_limit);
                w.put_u32(t.flags);
                w.put_u32(t.modified_seq);
            }
            LedgerEntry::Offer(o) => {
                w.put_u8(OFFER_TAG);
                w.put_account(&o.account);
                w.put_u32(o.sequence);
                w.put_amount(&o.taker_pays);
                w.put_amount(&o.taker_gets);
                w.put_hash(&o.book_index);
                w.put_u32(o.modified_seq);
            }
        }
        w.into_bytes()
    }

    /// Decode an entry from canonical bytes.
    ///
    /// # Errors
    ///
    /// Fails on truncated, trailing, or unknown-tag input. Entry bytes
    /// only ever come from this engine's own trees, so a decode failure
    /// is a fatal state corruption, not a user error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = WireReader::new(bytes);
        let tag = r.get_u8()?;
        let entry = match tag {
            ACCOUNT_TAG => LedgerEntry::Account(AccountRoot {
                account: r.get_account()?,
                balance: r.get_i64()?,
                sequence: r.get_u32()?,
                flags: r.get_u32()?,
                owner_count: r.get_u32()?,
                modified_seq: r.get_u32()?,
            }),
            TRUSTLINE_TAG => LedgerEntry::TrustLine(TrustLineEntry {
                low: r.get_account()?,
                high: r.get_account()?,
                currency: r.get_currency()?,
                balance: r.get_i64()?,
                low_limit: r.get_i64()?,
                high_limit: r.get_i64()?,
                flags: r.get_u32()?,
                modified_seq: r.get_u32()?,
            }),
            OFFER_TAG => LedgerEntry::Offer(OfferEntry {
                account: r.get_account()?,
                sequence: r.get_u32()?,
                taker_pays: r.get_amount()?,
                taker_gets: r.get_amount()?,
                book_index: r.get_hash()?,
                modified_seq: r.get_u32()?,
            }),
            other => {
                return Err(crate::TxError::Wire(WireError::UnknownTag {
                    tag: other,
                    offset: 0,
                }))
            }
        };
        r.finish()?;
        Ok(entry)
    }

    /// The account root, if this is one.
    pub fn as_account(&self) -> Option<&AccountRoot> {
        match self {
            LedgerEntry::Account(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_trustline(&self) -> Option<&TrustLineEntry> {
        match self {
            LedgerEntry::TrustLine(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_offer(&self) -> Option<&OfferEntry> {
        match self {
            LedgerEntry::Offer(o) => Some(o),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seiche_common::Asset;

    fn account(n: u8) -> AccountId {
        AccountId::from_public_key_bytes(&[n; 32])
    }

    #[test]
    fn test_account_roundtrip() {
        let mut root = AccountRoot::new(account(1), 5_000);
        root.sequence = 9;
        root.flags = ACCOUNT_FLAG_GLOBAL_FREEZE;
        root.owner_count = 2;
        root.modified_seq = 17;

        let entry = LedgerEntry::Account(root.clone());
        let decoded = LedgerEntry::from_bytes(&entry.to_bytes()).unwrap();
        assert_eq!(decoded.as_account(), Some(&root));
        assert!(root.is_globally_frozen());
    }

    #[test]
    fn test_trustline_perspective() {
        let a = account(1);
        let b = account(2);
        let foo = Currency::from_code("FOO").unwrap();
        let mut line = TrustLineEntry::new(a, b, foo);

        line.credit(&a, 500);
        assert_eq!(line.holding_of(&a), 500);
        assert_eq!(line.holding_of(&b), -500);

        line.credit(&b, 200);
        assert_eq!(line.holding_of(&a), 300);

        line.set_limit_of(&a, 1_000);
        assert_eq!(line.limit_of(&a), 1_000);
        assert_eq!(line.limit_of(&b), 0);
    }

    #[test]
    fn test_trustline_endpoint_order_is_canonical() {
        let a = account(1);
        let b = account(2);
        let foo = Currency::from_code("FOO").unwrap();
        let ab = TrustLineEntry::new(a, b, foo);
        let ba = TrustLineEntry::new(b, a, foo);
        assert_eq!(ab.low, ba.low);
        assert_eq!(ab.high, ba.high);
    }

    #[test]
    fn test_default_trustline_detection() {
        let line = TrustLineEntry::new(account(1), account(2), Currency::from_code("FOO").unwrap());
        assert!(line.is_default());

        let mut funded = line.clone();
        funded.balance = 1;
        assert!(!funded.is_default());
    }

    #[test]
    fn test_offer_roundtrip() {
        let offer = OfferEntry {
            account: account(3),
            sequence: 4,
            taker_pays: Amount {
                value: 100,
                asset: Asset::Native,
            },
            taker_gets: Amount::issued(
                2_000_000,
                Currency::from_code("FOO").unwrap(),
                account(9),
            ),
            book_index: Hash256::hash(b"book"),
            modified_seq: 12,
        };
        let entry = LedgerEntry::Offer(offer.clone());
        let decoded = LedgerEntry::from_bytes(&entry.to_bytes()).unwrap();
        assert_eq!(decoded.as_offer(), Some(&offer));
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        assert!(LedgerEntry::from_bytes(&[0x77]).is_err());
    }
}
