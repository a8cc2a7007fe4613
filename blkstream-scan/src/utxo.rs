//! The unspent transaction output tracker.
//!
//! Holds one compact entry per transaction with unspent outputs, keyed by a
//! word-sized prefix of the txid. At chain tip this set runs to hundreds of
//! millions of entries, so the layout is deliberate: a flat value array
//! sized to the transaction's exact output count, no stored txids, and an
//! open-addressed map under a non-cryptographic hasher.

use std::mem;

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use blkstream_chain::{
    amount::Amount,
    block::Height,
    transaction::{self, Transaction},
    transparent::{OutPoint, Script, SpendingInfo},
};

use crate::error::ScanError;

/// The map key: the leading bytes of a txid folded into one machine word.
///
/// Defined once so the prefix width can change without touching the map.
pub type TxidKey = u64;

/// Default number of txid bytes used for keying.
///
/// A 7-byte prefix is still collision-free over the whole chain; 8 adds
/// margin and fills the word.
pub const TXID_KEY_BYTES: usize = 8;

/// Marks a value slot whose output has been spent. Never a legal satoshi
/// amount, so double spends are detectable in place.
const SPENT: u64 = u64::MAX;

/// The tracker's record of one transaction's unspent outputs.
#[derive(Serialize, Deserialize)]
pub struct UtxEntry {
    /// One satoshi value per output, in output order; `SPENT` once
    /// consumed. Sized exactly, never resized.
    values: Box<[u64]>,
    /// The outputs' locking scripts, owned by the entry, present only when
    /// the tracker was built with script storage. Spending moves the script
    /// out to the caller.
    scripts: Option<Box<[Box<[u8]>]>>,
    /// How many outputs are still unspent; the entry is dropped at zero.
    remaining: u32,
    /// Height of the block that created the transaction, `-1` if unknown.
    height: i32,
}

impl UtxEntry {
    fn new(transaction: &Transaction, track_scripts: bool, height: Option<Height>) -> UtxEntry {
        let values: Box<[u64]> = transaction
            .outputs
            .iter()
            .map(|output| output.value.as_sat())
            .collect();
        let scripts = if track_scripts {
            Some(
                transaction
                    .outputs
                    .iter()
                    .map(|output| output.lock_script.as_ref().to_vec().into_boxed_slice())
                    .collect(),
            )
        } else {
            None
        };
        UtxEntry {
            remaining: values.len() as u32,
            values,
            scripts,
            height: height.map(|height| height.0 as i32).unwrap_or(-1),
        }
    }

    /// Per-output satoshi values, with `u64::MAX` marking spent slots.
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// How many outputs remain unspent.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Whether the output at `index` has already been spent.
    pub fn is_spent(&self, index: u32) -> bool {
        self.values
            .get(index as usize)
            .map_or(false, |value| *value == SPENT)
    }

    /// Height of the block that created this entry, if it was known.
    pub fn height(&self) -> Option<Height> {
        if self.height >= 0 {
            Some(Height(self.height as u32))
        } else {
            None
        }
    }
}

/// An in-memory index of every output produced but not yet consumed.
///
/// Single-writer: `add` and `spend` must not interleave with each other
/// from multiple threads. Consumers wanting parallelism partition work at
/// block boundaries above the tracker.
///
/// Serializable for external snapshotting; [`entries`](Self::entries)
/// iteration is the format-agnostic alternative.
#[derive(Serialize, Deserialize)]
pub struct UtxoTracker {
    entries: FxHashMap<TxidKey, UtxEntry>,
    key_mask: u64,
    track_scripts: bool,
}

impl UtxoTracker {
    /// A tracker with the default 8-byte txid prefix.
    ///
    /// With `track_scripts`, each entry also owns its outputs' locking
    /// scripts and hands them to the caller on spend.
    pub fn new(track_scripts: bool) -> UtxoTracker {
        UtxoTracker::with_key_bytes(TXID_KEY_BYTES, track_scripts)
    }

    /// A tracker keyed on the first `key_bytes` bytes of the txid
    /// (clamped to 1..=8), in case the collision margin must widen or a
    /// test wants to provoke collisions.
    pub fn with_key_bytes(key_bytes: usize, track_scripts: bool) -> UtxoTracker {
        let key_bytes = key_bytes.max(1).min(8);
        let key_mask = if key_bytes == 8 {
            u64::MAX
        } else {
            (1u64 << (8 * key_bytes)) - 1
        };
        UtxoTracker {
            entries: FxHashMap::default(),
            key_mask,
            track_scripts,
        }
    }

    fn key(&self, txid: &transaction::Hash) -> TxidKey {
        let mut word = [0u8; 8];
        word.copy_from_slice(&txid.0[..8]);
        u64::from_le_bytes(word) & self.key_mask
    }

    /// Record every output of `transaction` as unspent.
    ///
    /// A transaction with no outputs leaves no entry behind. Re-adding a
    /// txid (the chain's historical duplicate coinbases, or a prefix
    /// collision) replaces the previous entry.
    pub fn add(&mut self, transaction: &Transaction, height: Option<Height>) {
        if transaction.outputs.is_empty() {
            return;
        }
        let txid = transaction.txid();
        let entry = UtxEntry::new(transaction, self.track_scripts, height);
        trace!(%txid, outputs = entry.values.len(), "tracking outputs");
        if let Some(previous) = self.entries.insert(self.key(&txid), entry) {
            warn!(
                %txid,
                unspent = previous.remaining,
                "replaced an existing entry with the same txid prefix"
            );
        }
    }

    /// Consume the output `outpoint` refers to, returning what was spent.
    ///
    /// Fails with [`ScanError::NotFound`] if the transaction is untracked
    /// or the slot was already spent. When the last output of an entry is
    /// spent, the entry is removed in the same operation.
    pub fn spend(&mut self, outpoint: &OutPoint) -> Result<SpendingInfo, ScanError> {
        let key = self.key(&outpoint.hash);
        let not_found = || ScanError::NotFound {
            txid: outpoint.hash,
            index: outpoint.index,
        };

        let (info, emptied) = {
            let entry = self.entries.get_mut(&key).ok_or_else(not_found)?;
            let slot = entry
                .values
                .get_mut(outpoint.index as usize)
                .ok_or_else(not_found)?;
            if *slot == SPENT {
                return Err(not_found());
            }
            let value = mem::replace(slot, SPENT);
            let lock_script = entry
                .scripts
                .as_mut()
                .map(|scripts| {
                    // move the script out; the entry must not retain it
                    let script = mem::take(&mut scripts[outpoint.index as usize]);
                    Script::from(script.into_vec())
                });
            entry.remaining -= 1;
            let info = SpendingInfo {
                value: Amount::from_sat(value),
                lock_script,
                height: entry.height(),
            };
            (info, entry.remaining == 0)
        };
        if emptied {
            self.entries.remove(&key);
        }
        Ok(info)
    }

    /// Whether any output of `txid` is still tracked as unspent.
    pub fn contains(&self, txid: &transaction::Hash) -> bool {
        self.entries.contains_key(&self.key(txid))
    }

    /// Number of transactions with at least one unspent output.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the tracked entries, for external snapshotting.
    pub fn entries(&self) -> impl Iterator<Item = (TxidKey, &UtxEntry)> + '_ {
        self.entries.iter().map(|(key, entry)| (*key, entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use blkstream_chain::transaction::LockTime;
    use blkstream_chain::transparent::{CoinbaseData, Input, Output};

    fn coinbase(values: &[u64]) -> Transaction {
        Transaction::new(
            1,
            vec![Input::Coinbase {
                data: CoinbaseData::new(vec![0x51]),
                sequence: 0xFFFF_FFFF,
            }],
            values
                .iter()
                .map(|satoshis| Output {
                    value: Amount::from_sat(*satoshis),
                    lock_script: Script::new(vec![0xAC]),
                })
                .collect(),
            LockTime::unlocked(),
        )
    }

    fn outpoint(txid: transaction::Hash, index: u32) -> OutPoint {
        OutPoint { hash: txid, index }
    }

    #[test]
    fn spend_returns_value_and_height() {
        blkstream_test::init();
        let mut tracker = UtxoTracker::new(false);
        let tx = coinbase(&[5_000_000_000, 7]);
        tracker.add(&tx, Some(Height(42)));

        let info = tracker.spend(&outpoint(tx.txid(), 1)).unwrap();
        assert_eq!(info.value.as_sat(), 7);
        assert_eq!(info.height, Some(Height(42)));
        assert_eq!(info.lock_script, None);
        assert!(tracker.contains(&tx.txid()));
    }

    #[test]
    fn entry_is_removed_with_its_last_output() {
        blkstream_test::init();
        let mut tracker = UtxoTracker::new(false);
        let tx = coinbase(&[1, 2]);
        tracker.add(&tx, Some(Height(0)));

        tracker.spend(&outpoint(tx.txid(), 0)).unwrap();
        assert_eq!(tracker.len(), 1);
        tracker.spend(&outpoint(tx.txid(), 1)).unwrap();
        assert_eq!(tracker.len(), 0);
        assert!(!tracker.contains(&tx.txid()));
    }

    #[test]
    fn double_spends_are_not_found() {
        blkstream_test::init();
        let mut tracker = UtxoTracker::new(false);
        let tx = coinbase(&[1, 2]);
        tracker.add(&tx, None);

        tracker.spend(&outpoint(tx.txid(), 0)).unwrap();
        match tracker.spend(&outpoint(tx.txid(), 0)) {
            Err(ScanError::NotFound { index: 0, .. }) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
        // the sibling output is still spendable
        tracker.spend(&outpoint(tx.txid(), 1)).unwrap();
    }

    #[test]
    fn unknown_targets_are_not_found() {
        blkstream_test::init();
        let mut tracker = UtxoTracker::new(false);
        let tx = coinbase(&[1]);
        tracker.add(&tx, None);

        // untracked txid
        let missing = transaction::Hash([0xEE; 32]);
        assert!(matches!(
            tracker.spend(&outpoint(missing, 0)),
            Err(ScanError::NotFound { .. })
        ));
        // out-of-range output index
        assert!(matches!(
            tracker.spend(&outpoint(tx.txid(), 9)),
            Err(ScanError::NotFound { index: 9, .. })
        ));
    }

    #[test]
    fn scripts_move_to_the_caller_once() {
        blkstream_test::init();
        let mut tracker = UtxoTracker::new(true);
        let tx = coinbase(&[1, 2]);
        tracker.add(&tx, Some(Height(3)));

        let info = tracker.spend(&outpoint(tx.txid(), 0)).unwrap();
        assert_eq!(info.lock_script, Some(Script::new(vec![0xAC])));
        assert_eq!(info.height, Some(Height(3)));
    }

    #[test]
    fn zero_output_transactions_leave_no_entry() {
        blkstream_test::init();
        let mut tracker = UtxoTracker::new(false);
        let tx = coinbase(&[]);
        tracker.add(&tx, None);
        assert!(tracker.is_empty());
    }

    #[test]
    fn unknown_height_round_trips_as_none() {
        blkstream_test::init();
        let mut tracker = UtxoTracker::new(false);
        let tx = coinbase(&[9]);
        tracker.add(&tx, None);
        let info = tracker.spend(&outpoint(tx.txid(), 0)).unwrap();
        assert_eq!(info.height, None);
    }

    #[test]
    fn narrow_keys_still_resolve() {
        blkstream_test::init();
        let mut tracker = UtxoTracker::with_key_bytes(4, false);
        let tx = coinbase(&[21]);
        tracker.add(&tx, None);
        let info = tracker.spend(&outpoint(tx.txid(), 0)).unwrap();
        assert_eq!(info.value.as_sat(), 21);
    }

    #[test]
    fn snapshot_iteration_sees_live_entries() {
        blkstream_test::init();
        let mut tracker = UtxoTracker::new(false);
        let a = coinbase(&[1, 2]);
        let b = coinbase(&[3, 4, 5]);
        tracker.add(&a, Some(Height(0)));
        tracker.add(&b, Some(Height(1)));
        tracker.spend(&outpoint(a.txid(), 0)).unwrap();

        let mut remaining: Vec<u32> = tracker.entries().map(|(_, e)| e.remaining()).collect();
        remaining.sort_unstable();
        assert_eq!(remaining, vec![1, 3]);

        let spent_flags: Vec<bool> = tracker
            .entries()
            .find(|(_, e)| e.remaining() == 1)
            .map(|(_, e)| (0..2).map(|i| e.is_spent(i)).collect())
            .unwrap();
        assert_eq!(spent_flags, vec![true, false]);
    }
}
