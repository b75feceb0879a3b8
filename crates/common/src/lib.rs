//! Common types for the seiche ledger engine.
//!
//! This crate provides the fundamental vocabulary shared by every other
//! crate in the workspace:
//!
//! - [`Hash256`]: the 256-bit digest used for ledger hashes, transaction
//!   identifiers, state-tree roots, and derived object indexes
//! - [`AccountId`]: a 20-byte account identifier derived from a public key
//! - [`Asset`] / [`Amount`]: native and issued value representations
//! - [`quality`]: the fixed-point exchange-rate encoding used to order
//!   offers in a price-sorted book directory
//! - [`wire`]: canonical big-endian binary encoding, the byte layer every
//!   digest in the engine commits over
//! - [`time`]: ledger close-time resolution helpers
//!
//! Everything here is deterministic: two nodes encoding the same values
//! produce the same bytes, and therefore the same digests.

pub mod amount;
pub mod quality;
pub mod time;
pub mod types;
pub mod wire;

pub use amount::{Amount, Asset, Currency, ISSUED_UNIT};
pub use types::{AccountId, Hash256};
pub use wire::{WireError, WireReader, WireWriter};
