//! The transaction envelope.
//!
//! A [`Transaction`] is one signed instruction from one account: its
//! kind-specific payload, the account's sequence number, the declared
//! fee, and the ed25519 authorization. The canonical signed bytes are
//! hashed into the transaction's 256-bit identifier; that identifier is
//! what candidate sets, canonical ordering, and outcome records key on.

use crate::{Result, TxError};
use seiche_common::{AccountId, Amount, Hash256, WireError, WireReader, WireWriter};
use seiche_crypto::{sha256, PublicKey, SecretKey, Signature};

/// Minimum declared fee in drops; anything lower is malformed.
pub const MIN_TX_FEE: i64 = 10;

/// Domain separator prefixed to the unsigned bytes before signing.
const SIGNING_TAG: &[u8] = b"seiche:tx:";

const PAYMENT_TAG: u8 = 0x01;
const TRUST_SET_TAG: u8 = 0x02;
const ACCOUNT_SET_TAG: u8 = 0x03;
const OFFER_CREATE_TAG: u8 = 0x04;
const OFFER_CANCEL_TAG: u8 = 0x05;

/// The operation a transaction performs.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TxKind {
    /// Move value to another account. Native payments to a missing
    /// account create it.
    Payment {
        destination: AccountId,
        amount: Amount,
    },
    /// Create or adjust the sender's trust line toward an issuer.
    /// `limit` names the currency, the issuer, and the holding cap.
    TrustSet { limit: Amount, flags: u32 },
    /// Set and/or clear account flags.
    AccountSet { set_flags: u32, clear_flags: u32 },
    /// Place an offer exchanging `taker_gets` for `taker_pays`.
    OfferCreate {
        taker_pays: Amount,
        taker_gets: Amount,
    },
    /// Withdraw the offer created at `offer_sequence`.
    OfferCancel { offer_sequence: u32 },
}

impl TxKind {
    fn encode(&self, w: &mut WireWriter) {
        match self {
            TxKind::Payment {
                destination,
                amount,
            } => {
                w.put_u8(PAYMENT_TAG);
                w.put_account(destination);
                w.put_amount(amount);
            }
            TxKind::TrustSet { limit, flags } => {
                w.put_u8(TRUST_SET_TAG);
                w.put_amount(limit);
                w.put_u32(*flags);
            }
            TxKind::AccountSet {
                set_flags,
                clear_flags,
            } => {
                w.put_u8(ACCOUNT_SET_TAG);
                w.put_u32(*set_flags);
                w.put_u32(*clear_flags);
            }
            TxKind::OfferCreate {
                taker_pays,
                taker_gets,
            } => {
                w.put_u8(OFFER_CREATE_TAG);
                w.put_amount(taker_pays);
                w.put_amount(taker_gets);
            }
            TxKind::OfferCancel { offer_sequence } => {
                w.put_u8(OFFER_CANCEL_TAG);
                w.put_u32(*offer_sequence);
            }
        }
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        let tag = r.get_u8()?;
        Ok(match tag {
            PAYMENT_TAG => TxKind::Payment {
                destination: r.get_account()?,
                amount: r.get_amount()?,
            },
            TRUST_SET_TAG => TxKind::TrustSet {
                limit: r.get_amount()?,
                flags: r.get_u32()?,
            },
            ACCOUNT_SET_TAG => TxKind::AccountSet {
                set_flags: r.get_u32()?,
                clear_flags: r.get_u32()?,
            },
            OFFER_CREATE_TAG => TxKind::OfferCreate {
                taker_pays: r.get_amount()?,
                taker_gets: r.get_amount()?,
            },
            OFFER_CANCEL_TAG => TxKind::OfferCancel {
                offer_sequence: r.get_u32()?,
            },
            other => {
                return Err(TxError::Wire(WireError::UnknownTag {
                    tag: other,
                    offset: 0,
                }))
            }
        })
    }
}

/// A signed transaction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Transaction {
    /// The source account, derived from the signing key.
    pub account: AccountId,
    /// The source account's sequence this transaction consumes.
    pub sequence: u32,
    /// Declared fee in drops, charged on every applied outcome.
    pub fee: i64,
    pub kind: TxKind,
    pub signing_pub_key: PublicKey,
    pub signature: Signature,
}

impl Transaction {
    /// Build and sign a transaction with `secret`.
    ///
    /// The source account is derived from the signing key, which is what
    /// makes the signature an authorization.
    pub fn signed(secret: &SecretKey, sequence: u32, fee: i64, kind: TxKind) -> Self {
        let signing_pub_key = secret.public_key();
        let mut tx = Self {
            account: signing_pub_key.account_id(),
            sequence,
            fee,
            kind,
            signing_pub_key,
            signature: Signature::ZERO,
        };
        tx.signature = secret.sign(&tx.signing_payload());
        tx
    }

    /// The canonical unsigned bytes.
    fn unsigned_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        w.put_account(&self.account);
        w.put_u32(self.sequence);
        w.put_i64(self.fee);
        self.kind.encode(&mut w);
        w.put_bytes(self.signing_pub_key.as_bytes());
        w.into_bytes()
    }

    /// The bytes the signature covers: a domain tag plus the unsigned
    /// bytes.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = SIGNING_TAG.to_vec();
        payload.extend_from_slice(&self.unsigned_bytes());
        payload
    }

    /// The canonical signed bytes: unsigned bytes plus the signature.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.unsigned_bytes();
        bytes.extend_from_slice(self.signature.as_bytes());
        bytes
    }

    /// Decode a transaction from its canonical signed bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = WireReader::new(bytes);
        let account = r.get_account()?;
        let sequence = r.get_u32()?;
        let fee = r.get_i64()?;
        let kind = TxKind::decode(&mut r)?;

        let pk_bytes: [u8; 32] = r.get_fixed()?;
        let signing_pub_key =
            PublicKey::from_bytes(&pk_bytes).map_err(|e| TxError::State(e.to_string()))?;
        let sig_bytes: [u8; 64] = r.get_fixed()?;
        r.finish()?;

        Ok(Self {
            account,
            sequence,
            fee,
            kind,
            signing_pub_key,
            signature: Signature(sig_bytes),
        })
    }

    /// The transaction identifier: SHA-256 of the canonical signed
    /// bytes.
    pub fn id(&self) -> Hash256 {
        sha256(&self.to_bytes())
    }

    /// Check the signature and that the signing key owns the source
    /// account.
    ///
    /// Both must hold: a valid signature from a key that does not derive
    /// the source account is a stolen envelope, not an authorization.
    pub fn verify_signature(&self) -> bool {
        self.signing_pub_key.account_id() == self.account
            && self
                .signing_pub_key
                .verify(&self.signing_payload(), &self.signature)
                .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(secret: &SecretKey, sequence: u32) -> Transaction {
        let destination = SecretKey::from_seed([99u8; 32]).account_id();
        Transaction::signed(
            secret,
            sequence,
            100,
            TxKind::Payment {
                destination,
                amount: Amount::drops(1_000),
            },
        )
    }

    #[test]
    fn test_signed_transaction_verifies() {
        let secret = SecretKey::from_seed([1u8; 32]);
        let tx = payment(&secret, 1);
        assert!(tx.verify_signature());
        assert_eq!(tx.account, secret.account_id());
    }

    #[test]
    fn test_tampering_breaks_signature() {
        let secret = SecretKey::from_seed([1u8; 32]);
        let mut tx = payment(&secret, 1);
        tx.fee = 1;
        assert!(!tx.verify_signature());
    }

    #[test]
    fn test_foreign_key_is_not_authorized() {
        let secret = SecretKey::from_seed([1u8; 32]);
        let thief = SecretKey::from_seed([2u8; 32]);
        let mut tx = payment(&secret, 1);
        // Re-sign with a different key without changing the account
        tx.signing_pub_key = thief.public_key();
        tx.signature = thief.sign(&tx.signing_payload());
        assert!(
            !tx.verify_signature(),
            "valid signature from a non-owning key must not authorize"
        );
    }

    #[test]
    fn test_id_is_stable_and_distinct() {
        let secret = SecretKey::from_seed([1u8; 32]);
        let a = payment(&secret, 1);
        let b = payment(&secret, 2);
        assert_eq!(a.id(), a.id());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_canonical_bytes_roundtrip() {
        let secret = SecretKey::from_seed([5u8; 32]);
        for kind in [
            TxKind::Payment {
                destination: SecretKey::from_seed([6u8; 32]).account_id(),
                amount: Amount::drops(77),
            },
            TxKind::AccountSet {
                set_flags: 1,
                clear_flags: 0,
            },
            TxKind::OfferCancel { offer_sequence: 3 },
        ] {
            let tx = Transaction::signed(&secret, 4, 50, kind);
            let decoded = Transaction::from_bytes(&tx.to_bytes()).unwrap();
            assert_eq!(decoded, tx);
            assert_eq!(decoded.id(), tx.id());
        }
    }
}
