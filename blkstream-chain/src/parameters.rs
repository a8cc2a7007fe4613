//! Constants of the mainnet on-disk block format.

use crate::block;

/// The network magic prefixed to every framed block on disk, read as a
/// little-endian u32.
pub const BLOCK_MAGIC: u32 = 0xD9B4_BEF9;

/// A zero magic marks the end of written data within a preallocated file.
pub const END_OF_DATA_MAGIC: u32 = 0;

/// The previous block hash of the genesis block: Bitcoin's `null` value.
pub const GENESIS_PREVIOUS_BLOCK_HASH: block::Hash = block::Hash([0; 32]);

/// The confirmation depth beyond which a block is treated as final.
pub const HEIGHT_SAFETY_MARGIN: u32 = 6;

/// The maximum size of a framed block payload, in bytes.
pub const MAX_BLOCK_BYTES: u64 = 4_000_000;

/// Returns the hash of the mainnet genesis block.
pub fn genesis_hash() -> block::Hash {
    // bitcoin-cli getblockhash 0
    "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        .parse()
        .expect("hard-coded hash parses")
}
