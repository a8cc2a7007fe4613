//! Blocks and block-related structures (heights, headers, hashes).
#![allow(clippy::unit_arg)]

mod hash;
mod header;
mod height;
mod iter;

pub mod merkle;

#[cfg(any(test, feature = "proptest-impl"))]
mod arbitrary;
#[cfg(test)]
mod tests;

use std::{convert::TryFrom, fmt, io};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    compactint::CompactInt, parameters::MAX_BLOCK_BYTES, DecodeError, WireDeserialize,
};

pub use hash::Hash;
pub use header::Header;
pub use height::Height;
pub use iter::Transactions;

/// A Bitcoin block: an 80-byte header followed by a list of transactions.
///
/// A block keeps the raw payload it was parsed from and decodes its
/// transactions lazily from it, so consumers that only need aggregate
/// statistics never hold a decoded transaction list.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "RawBlock", into = "RawBlock")]
pub struct Block {
    /// The block header, containing block metadata.
    pub header: Header,
    /// The height assigned by fork resolution; `None` until the block's
    /// place in the longest chain is known.
    pub height: Option<Height>,
    /// The raw payload: header bytes, transaction count, transactions.
    raw: Bytes,
    /// Number of transactions the payload declares.
    tx_count: usize,
    /// Offset of the first serialized transaction within `raw`.
    body_offset: usize,
}

impl Block {
    /// Parses a framed block payload.
    ///
    /// The header is decoded (and hashed) eagerly; the transaction section is
    /// only bounds-located, and decodes lazily through [`Block::transactions`].
    pub fn parse(raw: Bytes) -> Result<Block, DecodeError> {
        let header = Header::read_from(&raw)?;

        let mut cursor = io::Cursor::new(&raw[Header::LEN..]);
        let tx_count = CompactInt::wire_deserialize(&mut cursor)?.value();
        // Sanity check the count so corruption can't masquerade as a block
        if tx_count > MAX_BLOCK_BYTES / 60 {
            return Err(DecodeError::Parse(
                "block declares more transactions than its payload could hold",
            ));
        }
        let body_offset = Header::LEN + cursor.position() as usize;

        Ok(Block {
            header,
            height: None,
            tx_count: tx_count as usize,
            body_offset,
            raw,
        })
    }

    /// The memoized hash of this block's header.
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Number of transactions the payload declares.
    pub fn transaction_count(&self) -> usize {
        self.tx_count
    }

    /// The raw payload this block was parsed from.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// A fresh pass over this block's transactions.
    ///
    /// Each call re-parses from the start of the transaction section, so a
    /// block can be traversed any number of times.
    pub fn transactions(&self) -> Transactions<'_> {
        Transactions::new(&self.raw[..], self.body_offset, self.tx_count)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fmter = f.debug_struct("Block");
        if let Some(height) = self.height {
            fmter.field("height", &height);
        }
        fmter.field("hash", &self.hash()).finish()
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("height", &self.height)
            .field("hash", &self.hash())
            .field("transactions", &self.tx_count)
            .finish()
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.height == other.height
    }
}

impl Eq for Block {}

/// The serde image of a [`Block`]: its payload and assigned height.
///
/// Deserialization re-parses the payload, so every restored block upholds
/// the same invariants as a freshly decoded one.
#[derive(Serialize, Deserialize)]
struct RawBlock {
    height: Option<Height>,
    raw: Vec<u8>,
}

impl From<Block> for RawBlock {
    fn from(block: Block) -> RawBlock {
        RawBlock {
            height: block.height,
            raw: block.raw.to_vec(),
        }
    }
}

impl TryFrom<RawBlock> for Block {
    type Error = DecodeError;

    fn try_from(raw: RawBlock) -> Result<Block, DecodeError> {
        let mut block = Block::parse(Bytes::from(raw.raw))?;
        block.height = raw.height;
        Ok(block)
    }
}
