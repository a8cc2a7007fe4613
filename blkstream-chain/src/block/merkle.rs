//! The Merkle root carried in a block header.

use std::{fmt, io};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;
use serde::{Deserialize, Serialize};

use crate::serialization::{DecodeError, WireDeserialize, WireSerialize};

/// The root of a block's transaction Merkle tree.
///
/// Carried verbatim from the header; this crate never recomputes or checks
/// it against the transaction list.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct Root(pub [u8; 32]);

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut reversed_bytes = self.0;
        reversed_bytes.reverse();
        f.debug_tuple("merkle::Root")
            .field(&hex::encode(&reversed_bytes))
            .finish()
    }
}

impl WireSerialize for Root {
    fn wire_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        target.write_all(&self.0)
    }
}

impl WireDeserialize for Root {
    fn wire_deserialize<R: io::Read>(mut reader: R) -> Result<Self, DecodeError> {
        Ok(Root(<[u8; 32]>::wire_deserialize(&mut reader)?))
    }
}
