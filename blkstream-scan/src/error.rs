//! Errors surfaced by the block and transaction streams.

use thiserror::Error;

use blkstream_chain::{block, transaction, DecodeError};

/// An error surfaced by a stream's `next` step.
///
/// Decoders never swallow corruption and the fork resolver and tracker never
/// retry; failures arrive here instead of as silent omissions.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The on-disk data violated the wire format or the parent-chain shape.
    #[error("corrupt chain data: {0}")]
    Corruption(#[from] Corruption),

    /// A spend target was absent from the UTXO set or already spent.
    ///
    /// The consumer decides whether this aborts the scan or just marks the
    /// tracking as incomplete.
    #[error("unspent output not found: {txid}:{index}")]
    NotFound {
        txid: transaction::Hash,
        index: u32,
    },

    /// A file-system failure underneath the raw-file reader.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The consumer requested termination while the reader was suspended.
    #[error("scan cancelled")]
    Cancelled,
}

/// The ways on-disk chain data can be corrupt.
#[derive(Error, Debug)]
pub enum Corruption {
    /// A frame started with something other than the network magic.
    #[error("bad magic {found:#010x} in block file {file_no} at offset {offset}")]
    BadMagic { found: u32, file_no: u32, offset: u64 },

    /// A frame declared a size beyond the largest legal block.
    #[error("oversized frame of {size} bytes in block file {file_no} at offset {offset}")]
    OversizedFrame { size: u32, file_no: u32, offset: u64 },

    /// A frame ended before its declared size, with no more data coming.
    #[error("truncated frame in block file {file_no} at offset {offset}")]
    TruncatedFrame { file_no: u32, offset: u64 },

    /// A block or transaction failed to decode.
    #[error("{0}")]
    Decode(#[from] DecodeError),

    /// The first block on disk did not carry the all-zeros parent sentinel.
    #[error("first block {0} is not the genesis block")]
    MissingGenesis(block::Hash),

    /// Walking the parent chain revisited a block.
    #[error("parent chain cycle through block {0}")]
    Cycle(block::Hash),

    /// A block handed to the chain index did not extend its tip.
    #[error("block {0} does not extend the chain tip")]
    OutOfOrder(block::Hash),
}

impl From<DecodeError> for ScanError {
    fn from(e: DecodeError) -> ScanError {
        ScanError::Corruption(Corruption::Decode(e))
    }
}
