//! Transaction inputs and outputs.
#![allow(clippy::unit_arg)]

mod script;

#[cfg(any(test, feature = "proptest-impl"))]
mod arbitrary;

use std::io;

use blkstream_wire_derive::{BlkDeserialize, BlkSerialize};
use serde::{Deserialize, Serialize};

use crate::{
    amount::Amount, block, compactint::CompactInt, transaction, DecodeError, WireDeserialize,
    WireSerialize,
};

pub use script::Script;

/// The spent-output index a coinbase input carries instead of a real
/// reference.
pub const COINBASE_OUTPOINT_INDEX: u32 = 0xFFFF_FFFF;

/// Arbitrary data inserted by miners into a coinbase input's script slot.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CoinbaseData(pub(crate) Vec<u8>);

impl CoinbaseData {
    pub fn new(data: Vec<u8>) -> CoinbaseData {
        CoinbaseData(data)
    }

    pub fn serialized_size(&self) -> usize {
        CompactInt::size(self.0.len()) + self.0.len()
    }
}

impl AsRef<[u8]> for CoinbaseData {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl std::fmt::Debug for CoinbaseData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let escaped = String::from_utf8(
            self.0
                .iter()
                .cloned()
                .flat_map(std::ascii::escape_default)
                .collect(),
        )
        .expect("ascii::escape_default produces utf8");
        f.debug_tuple("CoinbaseData").field(&escaped).finish()
    }
}

/// OutPoint
///
/// A particular transaction output reference.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    Hash,
    BlkSerialize,
    BlkDeserialize,
)]
pub struct OutPoint {
    /// References the transaction that created the output being spent.
    pub hash: transaction::Hash,

    /// Identifies which output of that transaction is referenced; the
    /// first output is 0, etc.
    pub index: u32,
}

impl OutPoint {
    #[inline]
    pub const fn len() -> usize {
        36
    }

    /// Whether this is the sentinel reference carried by coinbase inputs:
    /// an all-zeros hash and the all-ones index.
    pub fn is_coinbase_sentinel(&self) -> bool {
        self.index == COINBASE_OUTPOINT_INDEX && self.hash.0 == [0; 32]
    }
}

/// What an input spent: the value (and optionally script) of the consumed
/// output, plus where that output was created.
///
/// Attached to `Input::PrevOut` by the UTXO tracker; never part of the wire
/// form.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SpendingInfo {
    /// The value of the spent output.
    pub value: Amount,
    /// The spent output's locking script, when the tracker stores scripts.
    pub lock_script: Option<Script>,
    /// The height of the block that created the spent output, if known.
    pub height: Option<block::Height>,
}

/// A transaction input.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Input {
    /// A reference to an output of a previous transaction.
    PrevOut {
        /// The previous output being spent.
        outpoint: OutPoint,
        /// The script that authorizes spending `outpoint`.
        unlock_script: Script,
        /// The sequence number for the input.
        sequence: u32,
        /// The output this input spends, filled in by the UTXO tracker.
        spent_output: Option<SpendingInfo>,
    },
    /// New coins created by the block reward.
    Coinbase {
        /// Free data inserted by the miner.
        data: CoinbaseData,
        /// The sequence number for the input.
        sequence: u32,
    },
}

impl Input {
    /// Returns `true` for the block-reward variant.
    pub fn is_coinbase(&self) -> bool {
        matches!(self, Input::Coinbase { .. })
    }

    /// The previous-output reference, absent for coinbase inputs.
    pub fn outpoint(&self) -> Option<&OutPoint> {
        match self {
            Input::PrevOut { outpoint, .. } => Some(outpoint),
            Input::Coinbase { .. } => None,
        }
    }

    pub fn sequence(&self) -> u32 {
        match self {
            Input::PrevOut { sequence, .. } => *sequence,
            Input::Coinbase { sequence, .. } => *sequence,
        }
    }

    /// The spending info attached by the UTXO tracker, if any.
    pub fn spent_output(&self) -> Option<&SpendingInfo> {
        match self {
            Input::PrevOut { spent_output, .. } => spent_output.as_ref(),
            Input::Coinbase { .. } => None,
        }
    }

    /// Attach tracker-resolved spending info. No-op on coinbase inputs.
    pub fn attach_spending_info(&mut self, info: SpendingInfo) {
        if let Input::PrevOut { spent_output, .. } = self {
            *spent_output = Some(info);
        }
    }

    /// Returns the serialized length (in bytes) of this input.
    pub fn len(&self) -> usize {
        match self {
            Input::PrevOut { unlock_script, .. } => {
                OutPoint::len() + unlock_script.serialized_size() + 4
            }
            Input::Coinbase { data, .. } => OutPoint::len() + data.serialized_size() + 4,
        }
    }
}

impl WireSerialize for Input {
    fn wire_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        match self {
            Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
                spent_output: _,
            } => {
                outpoint.wire_serialize(&mut target)?;
                unlock_script.wire_serialize(&mut target)?;
                sequence.wire_serialize(&mut target)
            }
            Input::Coinbase { data, sequence } => {
                [0u8; 32].wire_serialize(&mut target)?;
                COINBASE_OUTPOINT_INDEX.wire_serialize(&mut target)?;
                CompactInt::from(data.0.len()).wire_serialize(&mut target)?;
                target.write_all(&data.0)?;
                sequence.wire_serialize(&mut target)
            }
        }
    }
}

impl WireDeserialize for Input {
    fn wire_deserialize<R: io::Read>(mut reader: R) -> Result<Self, DecodeError> {
        let outpoint = OutPoint::wire_deserialize(&mut reader)?;
        let script = Script::wire_deserialize(&mut reader)?;
        let sequence = u32::wire_deserialize(&mut reader)?;
        if outpoint.is_coinbase_sentinel() {
            Ok(Input::Coinbase {
                data: CoinbaseData(script.into_bytes()),
                sequence,
            })
        } else {
            Ok(Input::PrevOut {
                outpoint,
                unlock_script: script,
                sequence,
                spent_output: None,
            })
        }
    }
}

/// A transaction output.
///
/// An output is an indivisible, discrete unit of value which can only be
/// consumed in its entirety by a later transaction's input. The set of
/// outputs created but not yet consumed is the UTXO set.
#[derive(
    Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash, BlkSerialize, BlkDeserialize,
)]
pub struct Output {
    /// Transaction value, in satoshis.
    pub value: Amount,

    /// The lock script defines the conditions under which this output can be
    /// spent.
    pub lock_script: Script,
}

impl Output {
    /// Returns the serialized length (in bytes) of this output.
    pub fn len(&self) -> usize {
        8 + self.lock_script.serialized_size()
    }
}
