#![allow(clippy::unit_arg)]
use crate::{
    compactint::CompactInt,
    serialization::{DecodeError, WireDeserialize, WireSerialize},
    transaction::MAX_TX_SIZE,
};
use serde::{Deserialize, Serialize};
use std::{fmt, io};

/// An encoding of a Bitcoin script.
///
/// Scripts are carried verbatim; nothing in this crate evaluates them.
#[derive(Clone, Default, Eq, PartialEq, Serialize, Deserialize, Hash)]
pub struct Script(pub Vec<u8>);

impl Script {
    pub fn new(bytes: Vec<u8>) -> Script {
        Script(bytes)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn serialized_size(&self) -> usize {
        CompactInt::size(self.0.len()) + self.0.len()
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Script {
        Script(bytes)
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Script")
            .field(&hex::encode(&self.0))
            .finish()
    }
}

impl WireSerialize for Script {
    fn wire_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        CompactInt::from(self.0.len()).wire_serialize(&mut writer)?;
        writer.write_all(&self.0[..])?;
        Ok(())
    }
}

impl WireDeserialize for Script {
    fn wire_deserialize<R: io::Read>(mut reader: R) -> Result<Self, DecodeError> {
        let len = CompactInt::wire_deserialize(&mut reader)?.value();
        // A declared length past the largest legal transaction can't be
        // satisfied by the surrounding span
        if len > MAX_TX_SIZE {
            return Err(DecodeError::Parse("script length exceeds maximum"));
        }
        let mut bytes = vec![0u8; len as usize];
        reader.read_exact(&mut bytes)?;
        Ok(Script(bytes))
    }
}
