//! Scanner configuration.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use blkstream_chain::{block::Block, parameters::HEIGHT_SAFETY_MARGIN};

use crate::blkfile::FilePosition;

/// Configuration for one scan over a node's raw block files.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScanConfig {
    /// Directory containing the node's `blk*.dat` files.
    pub blocks_dir: PathBuf,

    /// Keep watching for new data instead of stopping at end of written
    /// data. A tailing stream only ends on cancellation.
    pub tail: bool,

    /// On framing corruption, log and skip to the next file instead of
    /// surfacing the error.
    pub recover: bool,

    /// Emit every stored fork in topological order instead of the longest
    /// chain, without waiting for the safety margin.
    pub all_forks: bool,

    /// Restrict emitted blocks by height and/or timestamp.
    pub filter: BlockFilter,

    /// When spend tracking is on, also keep each output's locking script
    /// and hand it over on spend. Costs considerably more memory.
    pub track_scripts: bool,

    /// Confirmation depth a block needs before it is emitted.
    pub safety_margin: u32,

    /// How long the tailing reader sleeps between polls.
    pub poll_interval: Duration,

    /// Resume from a position captured by a previous scan.
    pub start: Option<FilePosition>,
}

impl Default for ScanConfig {
    fn default() -> ScanConfig {
        ScanConfig {
            blocks_dir: default_blocks_dir(),
            tail: false,
            recover: false,
            all_forks: false,
            filter: BlockFilter::default(),
            track_scripts: false,
            safety_margin: HEIGHT_SAFETY_MARGIN,
            poll_interval: Duration::from_secs(1),
            start: None,
        }
    }
}

impl ScanConfig {
    /// A config reading from `blocks_dir` with everything else default.
    pub fn in_dir(blocks_dir: impl Into<PathBuf>) -> ScanConfig {
        ScanConfig {
            blocks_dir: blocks_dir.into(),
            ..ScanConfig::default()
        }
    }
}

/// The directory a mainnet node writes block files to by default.
fn default_blocks_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bitcoin")
        .join("blocks")
}

/// Height and time bounds on emitted blocks.
///
/// Starts are inclusive, stops exclusive. Height bounds refer to assigned
/// heights, so in longest-chain mode a reached `stop_height` ends the
/// stream early; time bounds only filter, since timestamps may run
/// backwards.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BlockFilter {
    pub start_height: Option<u32>,
    pub stop_height: Option<u32>,
    pub start_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,
}

impl BlockFilter {
    /// A filter admitting the half-open height range `start..stop`.
    pub fn height_range(start: u32, stop: u32) -> BlockFilter {
        BlockFilter {
            start_height: Some(start),
            stop_height: Some(stop),
            ..BlockFilter::default()
        }
    }

    /// Whether this filter admits every block.
    pub fn is_empty(&self) -> bool {
        *self == BlockFilter::default()
    }

    pub(crate) fn admits(&self, block: &Block) -> bool {
        if let Some(height) = block.height {
            if self.start_height.map_or(false, |start| height.0 < start) {
                return false;
            }
            if self.stop_height.map_or(false, |stop| height.0 >= stop) {
                return false;
            }
        }
        let time = block.header.time;
        if self.start_time.map_or(false, |start| time < start) {
            return false;
        }
        if self.stop_time.map_or(false, |stop| time >= stop) {
            return false;
        }
        true
    }

    /// Whether `height` is at or past the exclusive stop bound.
    pub(crate) fn past_stop(&self, height: u32) -> bool {
        self.stop_height.map_or(false, |stop| height >= stop)
    }
}
