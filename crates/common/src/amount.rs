//! Asset and amount types.
//!
//! The engine moves two kinds of value:
//!
//! - **Native** value, denominated in integer drops. Fees are always paid
//!   in drops, and account balances are held in drops.
//! - **Issued** value, denominated in a 3-character currency code and
//!   tied to an issuing account. Issued balances live on trust lines
//!   between account pairs.
//!
//! Issued values are fixed-point with six decimal places ([`ISSUED_UNIT`]
//! per whole unit), so decimal amounts like `0.1 FOO` stay exact in
//! integer arithmetic. Trust-line limit checks use checked arithmetic, so
//! an overflowing credit surfaces as a failed transaction, never as
//! wraparound.

use crate::types::AccountId;
use std::fmt;

/// Number of fixed-point sub-units per whole issued unit.
pub const ISSUED_UNIT: i64 = 1_000_000;

/// A 3-byte currency code, e.g. `FOO`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Currency(pub [u8; 3]);

impl Currency {
    /// Parse a currency code from a 3-character ASCII string.
    ///
    /// Returns `None` if the input is not exactly 3 ASCII bytes.
    pub fn from_code(code: &str) -> Option<Self> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii) {
            return None;
        }
        let mut arr = [0u8; 3];
        arr.copy_from_slice(bytes);
        Some(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency({})", self)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{}", *b as char)?;
        }
        Ok(())
    }
}

/// The asset an amount is denominated in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Asset {
    /// The native asset, denominated in drops.
    Native,
    /// An issued asset: currency code plus issuing account.
    Issued {
        currency: Currency,
        issuer: AccountId,
    },
}

impl Asset {
    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }
}

/// A quantity of some asset.
///
/// For `Asset::Native` the value is in drops; for issued assets it is in
/// fixed-point sub-units ([`ISSUED_UNIT`] per whole unit). The value may
/// be negative in intermediate trust-line arithmetic, but transactions
/// carrying a non-positive amount are malformed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Amount {
    pub value: i64,
    pub asset: Asset,
}

impl Amount {
    /// A native amount of the given number of drops.
    pub fn drops(value: i64) -> Self {
        Self {
            value,
            asset: Asset::Native,
        }
    }

    /// An issued amount in fixed-point sub-units.
    pub fn issued(value: i64, currency: Currency, issuer: AccountId) -> Self {
        Self {
            value,
            asset: Asset::Issued { currency, issuer },
        }
    }

    /// An issued amount of whole units.
    pub fn issued_units(units: i64, currency: Currency, issuer: AccountId) -> Self {
        Self::issued(units.saturating_mul(ISSUED_UNIT), currency, issuer)
    }

    pub fn is_native(&self) -> bool {
        self.asset.is_native()
    }

    /// Positive amounts are the only ones a transaction may carry.
    pub fn is_positive(&self) -> bool {
        self.value > 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.asset {
            Asset::Native => write!(f, "{} drops", self.value),
            Asset::Issued { currency, issuer } => {
                write!(f, "{}/{}/{}", self.value, currency, issuer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> AccountId {
        AccountId::from_public_key_bytes(&[7u8; 32])
    }

    #[test]
    fn test_currency_from_code() {
        let c = Currency::from_code("FOO").unwrap();
        assert_eq!(c.to_string(), "FOO");

        assert!(Currency::from_code("TOOLONG").is_none());
        assert!(Currency::from_code("ab").is_none());
    }

    #[test]
    fn test_issued_units_scaling() {
        let c = Currency::from_code("FOO").unwrap();
        let a = Amount::issued_units(5, c, issuer());
        assert_eq!(a.value, 5 * ISSUED_UNIT);
        assert!(!a.is_native());
    }

    #[test]
    fn test_native_amount() {
        let a = Amount::drops(1_000);
        assert!(a.is_native());
        assert!(a.is_positive());
        assert!(!Amount::drops(0).is_positive());
        assert!(!Amount::drops(-5).is_positive());
    }
}
