//! Streaming access to the raw block files written by a Bitcoin full node.
//!
//! The node appends framed blocks to `blk*.dat` files in roughly topological
//! order, including orphans and abandoned forks. This crate walks those
//! files, decodes each frame with [`blkstream_chain`], resolves the longest
//! chain behind a confirmation-depth safety margin, and exposes the result
//! as two iterators: height-ordered [blocks](BlockIter) and their
//! [transactions](TransactionIter), optionally with every input resolved to
//! the output it spends.
//!
//! ```no_run
//! use blkstream_scan::{transactions, ScanConfig};
//!
//! let config = ScanConfig::default();
//! let mut largest = None;
//! for tx in transactions(config, true)? {
//!     let tx = tx?;
//!     if let Some(fee) = tx.fee() {
//!         largest = largest.max(Some(fee));
//!     }
//! }
//! # Ok::<(), blkstream_scan::ScanError>(())
//! ```

mod blkfile;
mod blockchain;
mod config;
mod error;
mod fork;
mod iter;
mod utxo;

pub use blkfile::FilePosition;
pub use blockchain::BlockChain;
pub use config::{BlockFilter, ScanConfig};
pub use error::{Corruption, ScanError};
pub use fork::ForkResolver;
pub use iter::{BlockIter, TransactionIter};
pub use utxo::{TxidKey, UtxEntry, UtxoTracker, TXID_KEY_BYTES};

pub use blkstream_chain::{
    amount::Amount,
    block::{self, Block},
    transaction::{self, Transaction},
    transparent::{self, SpendingInfo},
};

/// Stream blocks in canonical height order (or, with
/// [`ScanConfig::all_forks`], every stored block in topological order).
pub fn blocks(config: ScanConfig) -> Result<BlockIter, ScanError> {
    BlockIter::new(config)
}

/// Stream transactions in block order. With `track_spending` every
/// non-coinbase input carries the [`SpendingInfo`] of the output it spent.
pub fn transactions(config: ScanConfig, track_spending: bool) -> Result<TransactionIter, ScanError> {
    TransactionIter::new(config, track_spending)
}
