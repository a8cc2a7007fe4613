//! Transactions and transaction-related structures.

use std::io;

use blkstream_wire_derive::BlkSerialize;
use serde::{Deserialize, Serialize};

use crate::{
    amount::Amount, cached::Cached, compactint::CompactInt, serialization::sha256d, transparent,
    DecodeError, WireDeserialize, WireSerialize,
};

mod hash;
mod lock_time;

#[cfg(any(test, feature = "proptest-impl"))]
mod arbitrary;
#[cfg(test)]
mod tests;

pub use hash::Hash;
pub use lock_time::LockTime;

/// The maximum size of a transaction, in bytes.
pub const MAX_TX_SIZE: u64 = 1_000_000;

/// A Bitcoin transaction. This decoder reads the pre-witness wire layout;
/// SegWit serialization is not supported.
///
/// A transaction is an encoded data structure that facilitates the transfer
/// of value between public key addresses. This crate decodes them from the
/// node's on-disk block files and, optionally, resolves each input to the
/// output it spends; it never validates them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BlkSerialize)]
pub struct Transaction {
    /// The transaction version.
    pub version: i32,
    /// The transaction inputs.
    pub inputs: Vec<transparent::Input>,
    /// The transaction outputs.
    pub outputs: Vec<transparent::Output>,
    /// The transaction lock time.
    pub locktime: LockTime,
    txid: Cached<Hash>,
    size: Cached<u32>,
}

impl Transaction {
    pub fn new(
        version: i32,
        inputs: Vec<transparent::Input>,
        outputs: Vec<transparent::Output>,
        locktime: LockTime,
    ) -> Transaction {
        Transaction {
            version,
            inputs,
            outputs,
            locktime,
            txid: Cached::new(),
            size: Cached::new(),
        }
    }

    /// Get the txid of this transaction: the double-SHA256 of its serialized
    /// form, cached at decode time over the exact parsed span.
    pub fn txid(&self) -> Hash {
        if let Some(txid) = self.txid.value() {
            return txid;
        }
        Hash::from(self)
    }

    /// Returns `true` if this transaction is a coinbase transaction.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1
            && matches!(
                self.inputs.get(0),
                Some(transparent::Input::Coinbase { .. })
            )
    }

    /// The number of bytes this transaction occupied on disk, cached at
    /// decode time; recomputed for hand-built transactions.
    pub fn size(&self) -> u32 {
        self.size.value().unwrap_or(self.len() as u32)
    }

    /// Returns the serialized length (in bytes) of this transaction.
    pub fn len(&self) -> usize {
        let mut size = 4 + CompactInt::size(self.inputs.len());
        for input in self.inputs.iter() {
            size += input.len();
        }
        size += CompactInt::size(self.outputs.len());
        for output in self.outputs.iter() {
            size += output.len();
        }
        size + 4
    }

    /// The sum of this transaction's output values.
    pub fn output_sum(&self) -> Option<Amount> {
        self.outputs
            .iter()
            .try_fold(Amount::ZERO, |sum, output| sum.checked_add(output.value))
    }

    /// The fee this transaction paid: resolved input value minus output
    /// value.
    ///
    /// `None` for coinbase transactions, when any input is missing tracker
    /// spending info, or when the inputs don't cover the outputs.
    pub fn fee(&self) -> Option<Amount> {
        if self.is_coinbase() {
            return None;
        }
        let mut input_sum = Amount::ZERO;
        for input in self.inputs.iter() {
            let info = input.spent_output()?;
            input_sum = input_sum.checked_add(info.value)?;
        }
        input_sum.checked_sub(self.output_sum()?)
    }

    /// Parses one transaction from `src`, leaving the cursor just past it.
    ///
    /// The cursor exposes the underlying slice so the txid can be computed
    /// over the exact consumed span, making decode-then-hash stable.
    pub fn read_from(src: &mut io::Cursor<&[u8]>) -> Result<Transaction, DecodeError> {
        let start = src.position() as usize;
        let (version, inputs, outputs, locktime) = Self::read_fields(src).map_err(|e| match e {
            DecodeError::MalformedTx(reason) => DecodeError::MalformedTx(reason),
            DecodeError::MalformedVarint => DecodeError::MalformedTx("bad length prefix"),
            DecodeError::Parse(reason) => DecodeError::MalformedTx(reason),
            DecodeError::Io(_) => DecodeError::MalformedTx("transaction truncated"),
        })?;
        let end = src.position() as usize;

        let span = &src.get_ref()[start..end];
        let txid = Hash(sha256d::hash(span));
        Ok(Transaction {
            version,
            inputs,
            outputs,
            locktime,
            txid: Cached::from(txid),
            size: Cached::from((end - start) as u32),
        })
    }

    #[allow(clippy::type_complexity)]
    fn read_fields(
        src: &mut io::Cursor<&[u8]>,
    ) -> Result<
        (
            i32,
            Vec<transparent::Input>,
            Vec<transparent::Output>,
            LockTime,
        ),
        DecodeError,
    > {
        let version = i32::wire_deserialize(&mut *src)?;
        let inputs = <Vec<transparent::Input>>::wire_deserialize(&mut *src)?;
        if inputs.is_empty() {
            // A zero input count is the SegWit marker, which this layout
            // does not carry
            return Err(DecodeError::MalformedTx("transaction has no inputs"));
        }
        let outputs = <Vec<transparent::Output>>::wire_deserialize(&mut *src)?;
        let locktime = LockTime::wire_deserialize(&mut *src)?;
        Ok((version, inputs, outputs, locktime))
    }
}
