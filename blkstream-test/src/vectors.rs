//! Raw mainnet byte vectors.
//!
//! The genesis block and block 1 are embedded exactly as a node stores them:
//! an unframed payload (80-byte header, transaction count, transactions),
//! and a framed variant carrying the magic and size prefix. The dummy spans
//! are slices of block 1 for building synthetic structures.

use lazy_static::lazy_static;

/// Mainnet genesis block payload, hex encoded (285 bytes decoded).
pub const GENESIS_BLOCK_HEX: &str = concat!(
    // header
    "01000000",
    "0000000000000000000000000000000000000000000000000000000000000000",
    "3ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a",
    "29ab5f49",
    "ffff001d",
    "1dac2b7c",
    // one transaction
    "01",
    "01000000",
    "01",
    "0000000000000000000000000000000000000000000000000000000000000000",
    "ffffffff",
    "4d",
    "04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368",
    "616e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c",
    "6f757420666f722062616e6b73",
    "ffffffff",
    "01",
    "00f2052a01000000",
    "43",
    "4104678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61",
    "deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf1",
    "1d5fac",
    "00000000",
);

/// Mainnet block 1 payload, hex encoded (215 bytes decoded).
pub const BLOCK_1_HEX: &str = concat!(
    // header
    "01000000",
    "6fe28c0ab6f1b372c1a6a246ae63f74f931e8365e15a089c68d6190000000000",
    "982051fd1e4ba744bbbe680e1fee14677ba1a3c3540bf7b1cdb606e857233e0e",
    "61bc6649",
    "ffff001d",
    "01e36299",
    // one transaction
    "01",
    "01000000",
    "01",
    "0000000000000000000000000000000000000000000000000000000000000000",
    "ffffffff",
    "07",
    "04ffff001d0104",
    "ffffffff",
    "01",
    "00f2052a01000000",
    "43",
    "410496b538e853519c726a2c91e61ec11600ae1390813a627c66fb8be7947be6",
    "3c52da7589379515d4e0a604f8141781e62294721166bf621e73a82cbf2342c8",
    "58eeac",
    "00000000",
);

lazy_static! {
    /// Mainnet genesis block payload.
    pub static ref GENESIS_BLOCK: Vec<u8> =
        hex::decode(GENESIS_BLOCK_HEX).expect("hard-coded hex decodes");

    /// Mainnet genesis block with its on-disk frame (magic + size prefix).
    pub static ref GENESIS_BLOCK_FRAMED: Vec<u8> = frame(&GENESIS_BLOCK);

    /// Mainnet block 1 payload.
    pub static ref BLOCK_1: Vec<u8> =
        hex::decode(BLOCK_1_HEX).expect("hard-coded hex decodes");

    /// Mainnet block 1 with its on-disk frame.
    pub static ref BLOCK_1_FRAMED: Vec<u8> = frame(&BLOCK_1);

    /// The block-1 header on its own.
    pub static ref DUMMY_HEADER: Vec<u8> = BLOCK_1[..80].to_vec();

    /// The block-1 coinbase transaction on its own.
    pub static ref DUMMY_TX1: Vec<u8> = BLOCK_1[81..].to_vec();

    /// One serialized output (value + script) from block 1's coinbase.
    pub static ref DUMMY_OUTPUT1: Vec<u8> = {
        // skip version, input count, the coinbase input, and output count
        let tx = &DUMMY_TX1[..];
        let start = 4 + 1 + (32 + 4 + 1 + 7 + 4) + 1;
        tx[start..tx.len() - 4].to_vec()
    };
}

/// Wrap a payload in the on-disk frame a node writes.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(payload.len() + 8);
    framed.extend_from_slice(&0xD9B4_BEF9u32.to_le_bytes());
    framed.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    framed.extend_from_slice(payload);
    framed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_lengths() {
        assert_eq!(GENESIS_BLOCK.len(), 285);
        assert_eq!(BLOCK_1.len(), 215);
        assert_eq!(GENESIS_BLOCK_FRAMED.len(), 285 + 8);
        assert_eq!(DUMMY_HEADER.len(), 80);
        assert_eq!(DUMMY_TX1.len(), 134);
        // value + one-byte length + 67 script bytes
        assert_eq!(DUMMY_OUTPUT1.len(), 8 + 1 + 67);
    }
}
