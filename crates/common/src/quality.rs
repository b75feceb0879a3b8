//! Offer quality (exchange rate) encoding.
//!
//! Competing offers for the same asset pair live in a book directory
//! whose 256-bit index carries two things:
//!
//! - the high 24 bytes identify the asset pair (the "book base"),
//! - the trailing 8 bytes carry the offer's rate, a fixed-point encoding
//!   of pays-per-gets whose unsigned ordering matches price ordering.
//!
//! Sorting directory indexes as plain 256-bit integers therefore sorts
//! offers within one book by price: a smaller rate asks for less input
//! per unit of output, which is the better deal for the taker.
//!
//! # Rate encoding
//!
//! A rate is `((exponent + 100) << 56) | mantissa` with the mantissa
//! normalized to `[10^15, 10^16)`. The bias keeps the exponent byte
//! non-negative and the shift leaves the mantissa fully below it, so
//! comparing encoded rates as `u64` compares the underlying ratios.
//! A one-to-one exchange encodes as `0x55038D7EA4C68000` (exponent -15,
//! mantissa 10^15).
//!
//! A rate of zero never arises from a well-formed offer and is reserved
//! as the invalid-quality sentinel.

use crate::amount::{Amount, Asset};
use crate::types::Hash256;
use crate::wire::WireWriter;

/// Bit position of the biased exponent within an encoded rate.
const RATE_EXPONENT_SHIFT: u32 = 56;

/// Exponent bias applied before encoding.
const RATE_EXPONENT_BIAS: i32 = 100;

/// Lower bound of the normalized mantissa range (inclusive).
const MANTISSA_MIN: u128 = 1_000_000_000_000_000;

/// Upper bound of the normalized mantissa range (exclusive).
const MANTISSA_MAX: u128 = 10_000_000_000_000_000;

/// The reserved invalid quality sentinel.
pub const INVALID_QUALITY: u64 = 0;

/// Extract the quality from a book directory index.
///
/// The rate occupies the trailing 8 bytes of the index, read as a
/// big-endian integer. The rest of the index (the book base) identifies
/// the asset pair and is irrelevant to price. Extraction is verbatim:
/// no arithmetic reinterpretation happens here.
///
/// An index whose rate field is all zeroes yields [`INVALID_QUALITY`];
/// see [`is_valid_quality`].
pub fn quality(book_index: &Hash256) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&book_index.0[24..32]);
    u64::from_be_bytes(raw)
}

/// Whether an extracted quality denotes a real rate.
///
/// Zero is the reserved sentinel for a missing or malformed rate field
/// and never compares as a legitimate price.
pub fn is_valid_quality(quality: u64) -> bool {
    quality != INVALID_QUALITY
}

/// Encode the rate of an offer paying `taker_pays` for `taker_gets`.
///
/// Returns [`INVALID_QUALITY`] when either amount is non-positive; a
/// well-formed offer never is.
pub fn rate(taker_pays: &Amount, taker_gets: &Amount) -> u64 {
    if taker_pays.value <= 0 || taker_gets.value <= 0 {
        return INVALID_QUALITY;
    }

    // mantissa * 10^exponent == pays / gets, mantissa in [10^15, 10^16)
    let mut mantissa = (taker_pays.value as u128) * 100_000_000_000_000_000 / taker_gets.value as u128;
    let mut exponent: i32 = -17;
    while mantissa >= MANTISSA_MAX {
        mantissa /= 10;
        exponent += 1;
    }
    while mantissa != 0 && mantissa < MANTISSA_MIN {
        mantissa *= 10;
        exponent -= 1;
    }
    if mantissa == 0 {
        return INVALID_QUALITY;
    }

    ((exponent + RATE_EXPONENT_BIAS) as u64) << RATE_EXPONENT_SHIFT | mantissa as u64
}

/// The directory index shared by all offers trading one asset pair.
///
/// The trailing 8 rate bytes are zero; [`index_with_quality`] fills them
/// in per offer.
pub fn book_base(taker_pays: &Asset, taker_gets: &Asset) -> Hash256 {
    let mut w = WireWriter::new();
    w.put_bytes(b"book");
    w.put_asset(taker_pays);
    w.put_asset(taker_gets);
    let mut index = Hash256::hash(w.as_slice()).0;
    index[24..32].fill(0);
    Hash256::from_bytes(index)
}

/// A full directory index: book base plus the offer's encoded rate.
pub fn index_with_quality(base: &Hash256, rate: u64) -> Hash256 {
    let mut index = base.0;
    index[24..32].copy_from_slice(&rate.to_be_bytes());
    Hash256::from_bytes(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Currency;
    use crate::types::AccountId;

    #[test]
    fn test_quality_extraction_vector() {
        let index = Hash256::from_hex(
            "d2dc44e5dc189318db36ef87d2104cdf0a0fe3a4b698beee55038d7ea4c68000",
        )
        .unwrap();
        assert_eq!(quality(&index), 6125895493223874560);
    }

    #[test]
    fn test_quality_of_zero_index_is_invalid() {
        assert_eq!(quality(&Hash256::ZERO), INVALID_QUALITY);
        assert!(!is_valid_quality(quality(&Hash256::ZERO)));
        assert!(is_valid_quality(6125895493223874560));
    }

    #[test]
    fn test_rate_ordering_matches_price() {
        // Asking 1 for 2 is a better deal than asking 1 for 1,
        // which is better than asking 2 for 1.
        let cheap = rate(&Amount::drops(1_000), &Amount::drops(2_000));
        let par = rate(&Amount::drops(1_000), &Amount::drops(1_000));
        let dear = rate(&Amount::drops(2_000), &Amount::drops(1_000));
        assert!(cheap < par, "half price should order below par");
        assert!(par < dear, "double price should order above par");
    }

    #[test]
    fn test_par_rate_encoding() {
        // Exponent -15 biased to 0x55, mantissa 10^15.
        let par = rate(&Amount::drops(1_000), &Amount::drops(1_000));
        assert_eq!(par, 0x55038D7EA4C68000);
    }

    #[test]
    fn test_rate_scale_invariance() {
        // The same ratio at different magnitudes encodes identically.
        let a = rate(&Amount::drops(3), &Amount::drops(7));
        let b = rate(&Amount::drops(3_000_000), &Amount::drops(7_000_000));
        assert_eq!(a, b);
    }

    #[test]
    fn test_rate_of_degenerate_offer_is_invalid() {
        assert_eq!(rate(&Amount::drops(0), &Amount::drops(5)), INVALID_QUALITY);
        assert_eq!(rate(&Amount::drops(5), &Amount::drops(0)), INVALID_QUALITY);
        assert_eq!(rate(&Amount::drops(-1), &Amount::drops(5)), INVALID_QUALITY);
    }

    #[test]
    fn test_book_index_roundtrip() {
        let issuer = AccountId::from_public_key_bytes(&[9u8; 32]);
        let foo = Currency::from_code("FOO").unwrap();
        let pays = Asset::Issued {
            currency: foo,
            issuer,
        };
        let base = book_base(&pays, &Asset::Native);
        assert_eq!(quality(&base), INVALID_QUALITY, "base carries no rate");

        let r = rate(&Amount::issued_units(1, foo, issuer), &Amount::drops(250));
        let index = index_with_quality(&base, r);
        assert_eq!(quality(&index), r);

        // Same book, same base bits
        assert_eq!(index.0[..24], base.0[..24]);
    }

    #[test]
    fn test_books_are_distinct_per_pair() {
        let issuer = AccountId::from_public_key_bytes(&[9u8; 32]);
        let foo = Currency::from_code("FOO").unwrap();
        let bar = Currency::from_code("BAR").unwrap();
        let foo_asset = Asset::Issued {
            currency: foo,
            issuer,
        };
        let bar_asset = Asset::Issued {
            currency: bar,
            issuer,
        };
        assert_ne!(
            book_base(&foo_asset, &Asset::Native),
            book_base(&bar_asset, &Asset::Native)
        );
        // Direction matters
        assert_ne!(
            book_base(&foo_asset, &Asset::Native),
            book_base(&Asset::Native, &foo_asset)
        );
    }
}
