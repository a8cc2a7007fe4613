//! The public block and transaction streams.

use std::collections::VecDeque;
use std::sync::{atomic::AtomicBool, Arc};

use tracing::trace;

use blkstream_chain::block::Block;
use blkstream_chain::transaction::Transaction;

use crate::blkfile::{FilePosition, FrameReader};
use crate::config::{BlockFilter, ScanConfig};
use crate::error::ScanError;
use crate::fork::ForkResolver;
use crate::utxo::UtxoTracker;

/// Height-ordered blocks of the longest chain (or every stored block in
/// topological order, in all-forks mode).
///
/// Composes the raw-file reader, the block decoder, and the fork resolver.
/// Dropping the iterator is the way to stop a scan; a tailing scan also
/// stops once its cancel flag is raised.
pub struct BlockIter {
    frames: FrameReader,
    resolver: ForkResolver,
    filter: BlockFilter,
    all_forks: bool,
    cancel: Arc<AtomicBool>,
    drained: bool,
    done: bool,
}

impl BlockIter {
    pub fn new(config: ScanConfig) -> Result<BlockIter, ScanError> {
        let cancel = Arc::new(AtomicBool::new(false));
        let frames = FrameReader::open(
            &config.blocks_dir,
            config.start,
            config.tail,
            config.recover,
            config.poll_interval,
            cancel.clone(),
        )?;
        Ok(BlockIter {
            frames,
            resolver: ForkResolver::new(config.safety_margin, config.all_forks),
            filter: config.filter,
            all_forks: config.all_forks,
            cancel,
            drained: false,
            done: false,
        })
    }

    /// Reopen a scan from a snapshot: `config.start` must name the frame
    /// after the last one the snapshotted `resolver` consumed. Iteration
    /// then produces exactly the suffix an uninterrupted scan would have.
    pub fn resume(config: ScanConfig, resolver: ForkResolver) -> Result<BlockIter, ScanError> {
        let mut blocks = BlockIter::new(config)?;
        blocks.resolver = resolver;
        Ok(blocks)
    }

    /// A flag that makes a tailing scan return [`ScanError::Cancelled`] at
    /// its next poll. Hand it to whatever decides when to stop.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// The file position of the next unread frame, for resuming later.
    pub fn position(&self) -> FilePosition {
        self.frames.position()
    }

    /// The resolver state, for snapshotting alongside [`position`](Self::position).
    pub fn resolver(&self) -> &ForkResolver {
        &self.resolver
    }

    /// Pull frames until the resolver releases something, the input ends,
    /// or an error surfaces.
    fn next_block(&mut self) -> Option<Result<Block, ScanError>> {
        loop {
            if self.done {
                return None;
            }
            if let Some(block) = self.resolver.pop_ready() {
                if let Some(height) = block.height {
                    // past the exclusive stop bound nothing further can be
                    // admitted in height order
                    if !self.all_forks && self.filter.past_stop(height.0) {
                        self.done = true;
                        return None;
                    }
                }
                if self.filter.admits(&block) {
                    return Some(Ok(block));
                }
                trace!(hash = %block.hash(), "block filtered out");
                continue;
            }
            if self.drained {
                self.done = true;
                return None;
            }

            match self.frames.next_frame() {
                Ok(Some(payload)) => {
                    let block = match Block::parse(payload) {
                        Ok(block) => block,
                        Err(e) => return Some(Err(e.into())),
                    };
                    if let Err(corruption) = self.resolver.insert(block) {
                        return Some(Err(corruption.into()));
                    }
                }
                Ok(None) => {
                    if let Err(corruption) = self.resolver.finish() {
                        return Some(Err(corruption.into()));
                    }
                    self.drained = true;
                }
                Err(ScanError::Cancelled) => {
                    self.done = true;
                    return Some(Err(ScanError::Cancelled));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl Iterator for BlockIter {
    type Item = Result<Block, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block()
    }
}

/// Transactions in block order, flat-mapped over the blocks stream.
///
/// With spend tracking on, each transaction's outputs are recorded before
/// its inputs are resolved, so a spend of an output created earlier in the
/// same block resolves like any other. Resolution failures surface as
/// [`ScanError::NotFound`] items; the stream continues past them, leaving
/// that input without spending info.
pub struct TransactionIter {
    blocks: BlockIter,
    tracker: Option<UtxoTracker>,
    pending: VecDeque<Result<Transaction, ScanError>>,
}

impl TransactionIter {
    pub fn new(config: ScanConfig, track_spending: bool) -> Result<TransactionIter, ScanError> {
        let tracker = if track_spending {
            Some(UtxoTracker::new(config.track_scripts))
        } else {
            None
        };
        Ok(TransactionIter {
            blocks: BlockIter::new(config)?,
            tracker,
            pending: VecDeque::new(),
        })
    }

    /// Reopen a tracked scan from a snapshot of its blocks state and
    /// tracker. See [`BlockIter::resume`].
    pub fn resume(
        config: ScanConfig,
        resolver: ForkResolver,
        tracker: Option<UtxoTracker>,
    ) -> Result<TransactionIter, ScanError> {
        Ok(TransactionIter {
            blocks: BlockIter::resume(config, resolver)?,
            tracker,
            pending: VecDeque::new(),
        })
    }

    /// A flag that makes a tailing scan return [`ScanError::Cancelled`] at
    /// its next poll.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.blocks.cancel_flag()
    }

    /// The UTXO tracker, when spend tracking is on. Snapshot its entries
    /// between pulls if the scan needs to be resumable.
    pub fn tracker(&self) -> Option<&UtxoTracker> {
        self.tracker.as_ref()
    }

    /// The file position of the next unread frame.
    pub fn position(&self) -> FilePosition {
        self.blocks.position()
    }

    /// The resolver state, for snapshotting alongside
    /// [`position`](Self::position).
    pub fn resolver(&self) -> &ForkResolver {
        self.blocks.resolver()
    }

    /// Decode one block's transactions into the pending queue, updating the
    /// tracker along the way.
    fn enqueue_block(&mut self, block: &Block) {
        for decoded in block.transactions() {
            let mut transaction = match decoded {
                Ok(transaction) => transaction,
                Err(e) => {
                    self.pending.push_back(Err(e.into()));
                    // the rest of the block is unreachable past a bad decode
                    return;
                }
            };
            if let Some(tracker) = &mut self.tracker {
                // outputs first, so intra-block spends resolve
                tracker.add(&transaction, block.height);
                for input in transaction.inputs.iter_mut() {
                    let outpoint = match input.outpoint() {
                        Some(outpoint) => *outpoint,
                        None => continue,
                    };
                    match tracker.spend(&outpoint) {
                        Ok(info) => input.attach_spending_info(info),
                        Err(e) => self.pending.push_back(Err(e)),
                    }
                }
            }
            self.pending.push_back(Ok(transaction));
        }
    }
}

impl Iterator for TransactionIter {
    type Item = Result<Transaction, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            match self.blocks.next()? {
                Ok(block) => self.enqueue_block(&block),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
