//! Canonical binary encoding.
//!
//! Every digest in the engine — ledger hashes, transaction identifiers,
//! state-tree roots — commits over bytes produced by this module. The
//! encoding is fixed and position-dependent: integers are big-endian,
//! variable-length fields carry a `u32` length prefix, and enums carry a
//! one-byte tag. Two nodes encoding the same value always produce the
//! same bytes; there is no map ordering or padding to disagree about.

use crate::amount::{Amount, Asset, Currency};
use crate::types::{AccountId, Hash256};
use thiserror::Error;

/// Errors produced when decoding canonical bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// Input ended before the expected field.
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEof(usize),

    /// An enum tag byte had no defined meaning.
    #[error("unknown tag byte {tag:#04x} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },

    /// A length prefix exceeded the remaining input.
    #[error("declared length {declared} exceeds remaining {remaining} bytes")]
    BadLength { declared: usize, remaining: usize },

    /// Decoding finished with unconsumed bytes.
    #[error("{0} trailing bytes after decoded value")]
    TrailingBytes(usize),
}

/// Append-only canonical encoder.
#[derive(Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Raw bytes, no length prefix. For fixed-width fields only.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Length-prefixed variable bytes.
    pub fn put_var_bytes(&mut self, bytes: &[u8]) {
        self.put_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_hash(&mut self, hash: &Hash256) {
        self.buf.extend_from_slice(&hash.0);
    }

    pub fn put_account(&mut self, account: &AccountId) {
        self.buf.extend_from_slice(&account.0);
    }

    pub fn put_currency(&mut self, currency: &Currency) {
        self.buf.extend_from_slice(&currency.0);
    }

    /// Tagged asset: `0x00` for native, `0x01 ‖ currency ‖ issuer` for
    /// issued.
    pub fn put_asset(&mut self, asset: &Asset) {
        match asset {
            Asset::Native => self.put_u8(0x00),
            Asset::Issued { currency, issuer } => {
                self.put_u8(0x01);
                self.put_currency(currency);
                self.put_account(issuer);
            }
        }
    }

    pub fn put_amount(&mut self, amount: &Amount) {
        self.put_i64(amount.value);
        self.put_asset(&amount.asset);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.put_u8(v as u8);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Cursor-based canonical decoder, the inverse of [`WireWriter`].
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.buf.len() - self.pos < n {
            return Err(WireError::UnexpectedEof(self.pos));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn get_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_be_bytes(self.get_fixed()?))
    }

    pub fn get_u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_be_bytes(self.get_fixed()?))
    }

    pub fn get_i64(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_be_bytes(self.get_fixed()?))
    }

    pub fn get_var_bytes(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.get_u32()? as usize;
        let remaining = self.buf.len() - self.pos;
        if len > remaining {
            return Err(WireError::BadLength {
                declared: len,
                remaining,
            });
        }
        self.take(len)
    }

    /// Read exactly `N` bytes into a fixed array.
    pub fn get_fixed<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let b = self.take(N)?;
        let mut arr = [0u8; N];
        arr.copy_from_slice(b);
        Ok(arr)
    }

    pub fn get_hash(&mut self) -> Result<Hash256, WireError> {
        let b = self.take(32)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(b);
        Ok(Hash256::from_bytes(arr))
    }

    pub fn get_account(&mut self) -> Result<AccountId, WireError> {
        let b = self.take(20)?;
        let mut arr = [0u8; 20];
        arr.copy_from_slice(b);
        Ok(AccountId::from(arr))
    }

    pub fn get_currency(&mut self) -> Result<Currency, WireError> {
        let b = self.take(3)?;
        let mut arr = [0u8; 3];
        arr.copy_from_slice(b);
        Ok(Currency(arr))
    }

    pub fn get_asset(&mut self) -> Result<Asset, WireError> {
        let offset = self.pos;
        match self.get_u8()? {
            0x00 => Ok(Asset::Native),
            0x01 => {
                let currency = self.get_currency()?;
                let issuer = self.get_account()?;
                Ok(Asset::Issued { currency, issuer })
            }
            tag => Err(WireError::UnknownTag { tag, offset }),
        }
    }

    pub fn get_amount(&mut self) -> Result<Amount, WireError> {
        let value = self.get_i64()?;
        let asset = self.get_asset()?;
        Ok(Amount { value, asset })
    }

    pub fn get_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.get_u8()? != 0)
    }

    /// Assert that the entire input was consumed.
    pub fn finish(self) -> Result<(), WireError> {
        let remaining = self.buf.len() - self.pos;
        if remaining != 0 {
            return Err(WireError::TrailingBytes(remaining));
        }
        Ok(())
    }
}
