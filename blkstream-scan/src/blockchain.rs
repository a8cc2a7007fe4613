//! An in-memory random-access index of the longest chain.

use std::collections::HashMap;

use blkstream_chain::block::{self, Block, Height};

use crate::error::{Corruption, ScanError};

/// The longest chain, indexed densely by height and by block hash.
///
/// Built by collecting a height-ordered block stream; a by-product of fork
/// resolution rather than a persistent store.
pub struct BlockChain {
    blocks: Vec<Block>,
    by_hash: HashMap<block::Hash, u32>,
}

impl BlockChain {
    /// Collect a height-ordered block stream into an index.
    pub fn load<I>(blocks: I) -> Result<BlockChain, ScanError>
    where
        I: IntoIterator<Item = Result<Block, ScanError>>,
    {
        let mut chain = BlockChain {
            blocks: Vec::new(),
            by_hash: HashMap::new(),
        };
        for block in blocks {
            chain.push(block?)?;
        }
        Ok(chain)
    }

    /// Append the next block of the chain.
    ///
    /// The block's assigned height must be the next dense height and its
    /// parent hash must match the current tip.
    pub fn push(&mut self, block: Block) -> Result<(), ScanError> {
        let hash = block.hash();
        let expected = self.blocks.len() as u32;
        if block.height != Some(Height(expected)) {
            return Err(Corruption::OutOfOrder(hash).into());
        }
        if let Some(tip) = self.tip() {
            if block.header.previous_block_hash != tip.hash() {
                return Err(Corruption::OutOfOrder(hash).into());
            }
        }
        self.by_hash.insert(hash, expected);
        self.blocks.push(block);
        Ok(())
    }

    /// The block at height 0.
    pub fn genesis(&self) -> Option<&Block> {
        self.blocks.first()
    }

    /// The deepest block.
    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Number of blocks in the chain.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn by_height(&self, height: Height) -> Option<&Block> {
        self.blocks.get(height.0 as usize)
    }

    pub fn by_hash(&self, hash: &block::Hash) -> Option<&Block> {
        self.height_of(hash).and_then(|height| self.by_height(height))
    }

    pub fn height_of(&self, hash: &block::Hash) -> Option<Height> {
        self.by_hash.get(hash).copied().map(Height)
    }

    /// The blocks in height order.
    pub fn iter(&self) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.iter()
    }
}
