//! Transaction result codes.
//!
//! Every application attempt resolves to a [`ResultCode`], and every
//! code belongs to exactly one [`ResultClass`]:
//!
//! | class     | fee | sequence | effect | recorded | retried |
//! |-----------|-----|----------|--------|----------|---------|
//! | Success   | yes | advanced | yes    | yes      | no      |
//! | Failure   | yes | advanced | no     | yes      | no      |
//! | Retry     | no  | no       | no     | no       | next pass |
//! | Malformed | no  | no       | no     | no       | no      |
//!
//! The class drives the closer's bookkeeping; the individual code is
//! what the outcome record reports to callers.

use crate::TxError;
use serde::Serialize;

/// The four-way partition of transaction outcomes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum ResultClass {
    /// Effect applied, fee charged, sequence consumed.
    Success,
    /// Well-formed but its effect cannot succeed: fee charged, sequence
    /// consumed, effect withheld. Permanently recorded.
    Failure,
    /// Preconditions not yet met; no state change. Reconsidered on the
    /// next pass and dropped silently if passes exhaust.
    Retry,
    /// Structurally invalid or unauthorized; no state change, never
    /// retried, never recorded.
    Malformed,
}

/// Concrete transaction outcomes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum ResultCode {
    /// The transaction's effect was applied.
    Applied,

    // -- Failure: fee charged, effect withheld --
    /// Insufficient balance to cover the transferred amount.
    Unfunded,
    /// A required trust line does not exist.
    NoTrustLine,
    /// The credit would push the holder past its trust-line limit.
    LimitExceeded,
    /// A frozen issuer blocks the movement.
    Frozen,
    /// The destination account does not exist and cannot be created by
    /// this transaction.
    NoDestination,

    // -- Retry: reconsidered next pass --
    /// The source account does not exist (yet).
    NoSourceAccount,
    /// The transaction's sequence is ahead of the account's.
    FutureSequence,
    /// The source account cannot currently pay the fee.
    FeeUnfunded,

    // -- Malformed: rejected outright --
    /// Signature or authorization check failed.
    BadSignature,
    /// The transaction's sequence was already consumed.
    PastSequence,
    /// Zero, negative, or otherwise meaningless amount.
    BadAmount,
    /// Source and destination are the same account.
    SelfPayment,
    /// Declared fee is below the network minimum.
    BadFee,
    /// Ill-formed offer (degenerate rate, identical assets, bad
    /// cancellation target).
    BadOffer,
    /// Unknown account flag bits.
    BadFlags,
}

impl ResultCode {
    /// The class this code belongs to.
    pub fn class(&self) -> ResultClass {
        use ResultCode::*;
        match self {
            Applied => ResultClass::Success,
            Unfunded | NoTrustLine | LimitExceeded | Frozen | NoDestination => ResultClass::Failure,
            NoSourceAccount | FutureSequence | FeeUnfunded => ResultClass::Retry,
            BadSignature | PastSequence | BadAmount | SelfPayment | BadFee | BadOffer | BadFlags => {
                ResultClass::Malformed
            }
        }
    }

    /// Whether the outcome is recorded in the transaction tree.
    ///
    /// True exactly for Success and Failure: both charge a fee, consume
    /// a sequence number, and become part of the closed ledger.
    pub fn is_applied(&self) -> bool {
        matches!(self.class(), ResultClass::Success | ResultClass::Failure)
    }

    pub fn is_retry(&self) -> bool {
        self.class() == ResultClass::Retry
    }

    /// Stable byte encoding for outcome records.
    pub fn to_u8(&self) -> u8 {
        use ResultCode::*;
        match self {
            Applied => 0x00,
            Unfunded => 0x10,
            NoTrustLine => 0x11,
            LimitExceeded => 0x12,
            Frozen => 0x13,
            NoDestination => 0x14,
            NoSourceAccount => 0x20,
            FutureSequence => 0x21,
            FeeUnfunded => 0x22,
            BadSignature => 0x30,
            PastSequence => 0x31,
            BadAmount => 0x32,
            SelfPayment => 0x33,
            BadFee => 0x34,
            BadOffer => 0x35,
            BadFlags => 0x36,
        }
    }

    /// Inverse of [`ResultCode::to_u8`].
    ///
    /// # Errors
    ///
    /// An unknown byte is fatal: it means an outcome record this node
    /// cannot interpret, so the record cannot be trusted.
    pub fn from_u8(byte: u8) -> Result<Self, TxError> {
        use ResultCode::*;
        Ok(match byte {
            0x00 => Applied,
            0x10 => Unfunded,
            0x11 => NoTrustLine,
            0x12 => LimitExceeded,
            0x13 => Frozen,
            0x14 => NoDestination,
            0x20 => NoSourceAccount,
            0x21 => FutureSequence,
            0x22 => FeeUnfunded,
            0x30 => BadSignature,
            0x31 => PastSequence,
            0x32 => BadAmount,
            0x33 => SelfPayment,
            0x34 => BadFee,
            0x35 => BadOffer,
            0x36 => BadFlags,
            other => return Err(TxError::UnknownResultCode(other)),
        })
    }
}

/// The recorded outcome of an included transaction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct TxOutcome {
    /// How the transaction settled.
    pub code: ResultCode,
    /// Drops charged (the declared fee for applied outcomes).
    pub fee_charged: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ResultCode; 16] = [
        ResultCode::Applied,
        ResultCode::Unfunded,
        ResultCode::NoTrustLine,
        ResultCode::LimitExceeded,
        ResultCode::Frozen,
        ResultCode::NoDestination,
        ResultCode::NoSourceAccount,
        ResultCode::FutureSequence,
        ResultCode::FeeUnfunded,
        ResultCode::BadSignature,
        ResultCode::PastSequence,
        ResultCode::BadAmount,
        ResultCode::SelfPayment,
        ResultCode::BadFee,
        ResultCode::BadOffer,
        ResultCode::BadFlags,
    ];

    #[test]
    fn test_byte_encoding_roundtrip() {
        for code in ALL {
            assert_eq!(ResultCode::from_u8(code.to_u8()).unwrap(), code);
        }
        assert!(ResultCode::from_u8(0xff).is_err());
    }

    #[test]
    fn test_applied_matches_class() {
        for code in ALL {
            let expected = matches!(
                code.class(),
                ResultClass::Success | ResultClass::Failure
            );
            assert_eq!(code.is_applied(), expected, "{code:?}");
        }
    }

    #[test]
    fn test_only_retry_codes_retry() {
        assert!(ResultCode::NoSourceAccount.is_retry());
        assert!(ResultCode::FutureSequence.is_retry());
        assert!(ResultCode::FeeUnfunded.is_retry());
        assert!(!ResultCode::Applied.is_retry());
        assert!(!ResultCode::Frozen.is_retry());
        assert!(!ResultCode::BadSignature.is_retry());
    }
}
