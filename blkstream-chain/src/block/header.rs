use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use blkstream_wire_derive::{BlkDeserialize, BlkSerialize};

use crate::{
    cached::Cached, serialization::sha256d, DecodeError, WireDeserialize, WireSerialize,
};

use super::{merkle, Hash};

/// A block header, containing metadata about a block.
///
/// Blocks are chained together via the backwards reference (previous header
/// hash) present in the block header. Each block points backwards to its
/// parent, all the way back to the genesis block.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, BlkSerialize, BlkDeserialize,
)]
pub struct Header {
    /// The block's version field.
    pub version: u32,

    /// The hash of the previous block, used to create a chain of blocks back
    /// to the genesis block.
    pub previous_block_hash: Hash,

    /// The root of the transaction Merkle tree, binding the block header to
    /// the transactions in the block. Carried, never recomputed.
    pub merkle_root: merkle::Root,

    /// The block timestamp is a Unix epoch time (UTC) when the miner started
    /// hashing the header (according to the miner). Successive blocks may
    /// report timestamps that run backwards.
    pub time: DateTime<Utc>,

    /// The nBits encoding of the target threshold this block's header hash
    /// had to meet. Carried opaquely.
    pub difficulty_bits: u32,

    /// An arbitrary field that miners change to vary the header hash.
    pub nonce: u32,

    /// For efficiency, we cache the hash of this header after computing it
    /// the first time. Not part of the wire serialization.
    hash: Cached<Hash>,
}

impl Header {
    /// Length of a serialized header in bytes.
    pub const LEN: usize = 80;

    pub fn new(
        version: u32,
        previous_block_hash: Hash,
        merkle_root: merkle::Root,
        time: DateTime<Utc>,
        difficulty_bits: u32,
        nonce: u32,
    ) -> Header {
        Header {
            version,
            previous_block_hash,
            merkle_root,
            time,
            difficulty_bits,
            nonce,
            hash: Cached::new(),
        }
    }

    /// The hash of this header, cached at decode time; recomputed for
    /// hand-built headers.
    pub fn hash(&self) -> Hash {
        if let Some(hash) = self.hash.value() {
            return hash;
        }
        Hash::from(self)
    }

    /// Parses a header from the front of `src`, hashing the 80 header bytes
    /// in the same pass so the block hash never needs a reserialization.
    pub fn read_from(src: &[u8]) -> Result<Header, DecodeError> {
        if src.len() < Header::LEN {
            return Err(DecodeError::Parse("not enough bytes in block header"));
        }
        let own_hash = Hash(sha256d::hash(&src[..Header::LEN]));

        let mut src = std::io::Cursor::new(&src[..Header::LEN]);
        Ok(Header {
            version: u32::wire_deserialize(&mut src)?,
            previous_block_hash: Hash::wire_deserialize(&mut src)?,
            merkle_root: merkle::Root::wire_deserialize(&mut src)?,
            time: <DateTime<Utc>>::wire_deserialize(&mut src)?,
            difficulty_bits: u32::wire_deserialize(&mut src)?,
            nonce: u32::wire_deserialize(&mut src)?,
            hash: Cached::from(own_hash),
        })
    }
}
