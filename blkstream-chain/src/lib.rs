//! Core Bitcoin data structures for blkstream: blocks, transactions, and the
//! wire codec used to decode them from a node's on-disk block files.
//!
//! This crate decodes and organizes; it does not validate consensus rules.

#![allow(clippy::unit_arg)]

pub mod amount;
pub mod block;
pub mod parameters;
pub mod transaction;
pub mod transparent;

mod cached;
mod compactint;
mod serialization;

pub use cached::Cached;
pub use compactint::CompactInt;
pub use serialization::{sha256d, DecodeError, WireDeserialize, WireDeserializeInto, WireSerialize};
