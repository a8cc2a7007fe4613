//! Turning physical file order into canonical chain order.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use blkstream_chain::{
    block::{self, Block, Height},
    parameters::GENESIS_PREVIOUS_BLOCK_HASH,
};

use crate::error::Corruption;

/// Buffers decoded blocks until their place in the chain is certain, then
/// releases them in height order.
///
/// Physical file order is approximately topological but carries orphans,
/// abandoned forks, and out-of-order arrivals. In longest-chain mode a
/// block is released once it sits `safety_margin` blocks below the best
/// tip, and sibling branches buried that deep are dropped. In all-forks
/// mode every block is released as soon as its parent is known, in
/// parent-before-child order, with heights still assigned.
///
/// Serializable, so a consumer can snapshot it (with the reader's
/// [`FilePosition`](crate::FilePosition)) and resume a scan later with the
/// same emitted suffix.
#[derive(Serialize, Deserialize)]
pub struct ForkResolver {
    /// Blocks not yet released or dropped, keyed by their hash. Blocks
    /// whose parent is unknown sit here with no height.
    by_hash: HashMap<block::Hash, Block>,
    /// The known children of each block hash.
    children: HashMap<block::Hash, Vec<block::Hash>>,
    /// Heights of released blocks, so late arrivals that reference them
    /// (duplicates, stale forks, out-of-order children) still resolve.
    released: HashMap<block::Hash, u32>,
    /// The deepest resolved block; ties keep the first-seen branch.
    tip: Option<block::Hash>,
    tip_height: u32,
    /// The height the next released block must have (longest-chain mode).
    next_emit: u32,
    safety_margin: u32,
    all_forks: bool,
    seen_genesis: bool,
    finished: bool,
    ready: VecDeque<Block>,
}

impl ForkResolver {
    pub fn new(safety_margin: u32, all_forks: bool) -> ForkResolver {
        ForkResolver {
            by_hash: HashMap::new(),
            children: HashMap::new(),
            released: HashMap::new(),
            tip: None,
            tip_height: 0,
            next_emit: 0,
            safety_margin,
            all_forks,
            seen_genesis: false,
            finished: false,
            ready: VecDeque::new(),
        }
    }

    /// Feed in one decoded block. Anything this finalizes becomes available
    /// through [`pop_ready`](Self::pop_ready).
    pub fn insert(&mut self, block: Block) -> Result<(), Corruption> {
        let hash = block.hash();
        let parent = block.header.previous_block_hash;

        if !self.seen_genesis {
            // the first block on disk is always the genesis block
            if parent != GENESIS_PREVIOUS_BLOCK_HASH {
                return Err(Corruption::MissingGenesis(hash));
            }
            self.seen_genesis = true;
        }
        if self.by_hash.contains_key(&hash) || self.released.contains_key(&hash) {
            trace!(%hash, "duplicate block");
            return Ok(());
        }

        self.children.entry(parent).or_default().push(hash);

        let height = if parent == GENESIS_PREVIOUS_BLOCK_HASH {
            Some(0)
        } else {
            self.parent_height(&parent).map(|parent| parent + 1)
        };

        let mut block = block;
        block.height = height.map(Height);
        self.by_hash.insert(hash, block);

        match height {
            Some(height) => self.resolve_from(hash, height),
            None => {
                trace!(%hash, "buffered block with unknown parent");
                Ok(())
            }
        }
    }

    /// The next finalized block, in release order.
    pub fn pop_ready(&mut self) -> Option<Block> {
        self.ready.pop_front()
    }

    /// The best tip resolved so far.
    pub fn tip(&self) -> Option<(block::Hash, Height)> {
        self.tip.map(|hash| (hash, Height(self.tip_height)))
    }

    /// Release the rest of the canonical chain, margin or not.
    ///
    /// Called when the input is exhausted and no deeper burial is coming;
    /// tailing scans never call it.
    pub fn finish(&mut self) -> Result<(), Corruption> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        if self.all_forks {
            if !self.by_hash.is_empty() {
                warn!(
                    pending = self.by_hash.len(),
                    "dropping blocks with unresolved parents at end of data"
                );
                self.by_hash.clear();
            }
            return Ok(());
        }
        let tip = match self.tip {
            Some(tip) => tip,
            None => return Ok(()),
        };
        let tip_height = self.tip_height;
        self.release_chain_to(tip, tip_height)?;
        if !self.by_hash.is_empty() {
            debug!(
                pending = self.by_hash.len(),
                "dropping non-canonical blocks at end of data"
            );
            self.by_hash.clear();
        }
        Ok(())
    }

    fn parent_height(&self, parent: &block::Hash) -> Option<u32> {
        if let Some(parent_block) = self.by_hash.get(parent) {
            return parent_block.height.map(|height| height.0);
        }
        self.released.get(parent).copied()
    }

    /// Push the newly known height through every descendant that was
    /// waiting on it, update the tip, then release whatever the mode allows.
    fn resolve_from(&mut self, hash: block::Hash, height: u32) -> Result<(), Corruption> {
        let mut resolved = vec![(hash, height)];
        let mut stack = vec![(hash, height)];
        while let Some((parent_hash, parent_height)) = stack.pop() {
            let waiting = match self.children.get(&parent_hash) {
                Some(children) => children.clone(),
                None => continue,
            };
            for child in waiting {
                if let Some(child_block) = self.by_hash.get_mut(&child) {
                    if child_block.height.is_none() {
                        let child_height = parent_height + 1;
                        child_block.height = Some(Height(child_height));
                        resolved.push((child, child_height));
                        stack.push((child, child_height));
                    }
                }
            }
        }

        for (hash, height) in &resolved {
            if self.tip.is_none() || *height > self.tip_height {
                self.tip = Some(*hash);
                self.tip_height = *height;
            }
        }

        if self.all_forks {
            // discovery order is parent-before-child here
            for (hash, height) in resolved {
                let block = self
                    .by_hash
                    .remove(&hash)
                    .expect("resolved blocks are buffered");
                self.released.insert(hash, height);
                self.ready.push_back(block);
            }
            Ok(())
        } else {
            self.release_finalized()
        }
    }

    /// Release every block buried at least `safety_margin` below the tip.
    fn release_finalized(&mut self) -> Result<(), Corruption> {
        let tip = match self.tip {
            Some(tip) => tip,
            None => return Ok(()),
        };
        let final_height = match self.tip_height.checked_sub(self.safety_margin) {
            Some(height) => height,
            None => return Ok(()),
        };
        self.release_chain_to(tip, final_height)
    }

    /// Walk the ancestors of `from` and release the buffered ones at or
    /// below height `upto`, lowest first.
    fn release_chain_to(&mut self, from: block::Hash, upto: u32) -> Result<(), Corruption> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = from;
        loop {
            if !seen.insert(cursor) {
                return Err(Corruption::Cycle(cursor));
            }
            let block = match self.by_hash.get(&cursor) {
                Some(block) => block,
                // walked past the buffered region into released territory
                None => break,
            };
            let height = block
                .height
                .expect("the tip's ancestors have resolved heights")
                .0;
            if height < self.next_emit {
                break;
            }
            if height <= upto {
                path.push(cursor);
            }
            cursor = block.header.previous_block_hash;
        }

        for hash in path.into_iter().rev() {
            let block = self
                .by_hash
                .remove(&hash)
                .expect("finalized ancestors are buffered");
            let height = block.height.expect("finalized blocks have heights").0;
            self.released.insert(hash, height);
            self.prune_siblings(&block);
            self.next_emit = height + 1;
            trace!(height, hash = %block.hash(), "block finalized");
            self.ready.push_back(block);
        }
        Ok(())
    }

    /// Drop the sibling branches of a finalized block; they are buried too
    /// deep to ever rejoin the longest chain.
    fn prune_siblings(&mut self, block: &Block) {
        let hash = block.hash();
        let siblings = match self.children.remove(&block.header.previous_block_hash) {
            Some(siblings) => siblings,
            None => return,
        };
        let mut stack: Vec<block::Hash> =
            siblings.into_iter().filter(|s| *s != hash).collect();
        if stack.is_empty() {
            return;
        }
        let mut dropped = 0usize;
        while let Some(stale) = stack.pop() {
            if self.by_hash.remove(&stale).is_some() {
                dropped += 1;
            }
            if let Some(children) = self.children.remove(&stale) {
                stack.extend(children);
            }
        }
        if dropped > 0 {
            warn!(below = %block.hash(), dropped, "dropped stale fork branch");
        }
    }
}
