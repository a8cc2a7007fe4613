use std::io;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{block, DecodeError, WireDeserialize, WireSerialize};

/// A transaction lock time.
///
/// On the wire this is a u32; values below 500 million name a block height,
/// anything at or above names a unix timestamp. This crate only decodes the
/// field, it never enforces its meaning.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum LockTime {
    /// Unlocked at or after this block height.
    Height(block::Height),
    /// Unlocked at or after this time.
    Time(DateTime<Utc>),
}

impl LockTime {
    /// The smallest wire value interpreted as a timestamp.
    pub const MIN_TIMESTAMP: u32 = 500_000_000;

    /// A lock time that locks nothing.
    pub fn unlocked() -> LockTime {
        LockTime::Height(block::Height(0))
    }
}

impl WireSerialize for LockTime {
    fn wire_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        match self {
            LockTime::Height(height) => height.0.wire_serialize(target),
            // the decoder only builds Time values from u32s, so this cast
            // cannot truncate
            LockTime::Time(time) => (time.timestamp() as u32).wire_serialize(target),
        }
    }
}

impl WireDeserialize for LockTime {
    fn wire_deserialize<R: io::Read>(reader: R) -> Result<Self, DecodeError> {
        let raw = u32::wire_deserialize(reader)?;
        if raw < Self::MIN_TIMESTAMP {
            Ok(LockTime::Height(block::Height(raw)))
        } else {
            Ok(LockTime::Time(Utc.timestamp(raw as i64, 0)))
        }
    }
}
