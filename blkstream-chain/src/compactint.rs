//! Bitcoin's compact integer encoding: a one-byte marker selecting a total
//! width of 1, 3, 5, or 9 bytes.

use crate::{DecodeError, WireDeserialize, WireSerialize};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactInt(u64);

impl CompactInt {
    pub fn new() -> CompactInt {
        CompactInt(0)
    }

    pub fn from(value: usize) -> CompactInt {
        CompactInt(value as u64)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The number of bytes `value` occupies once encoded.
    pub fn size(value: usize) -> usize {
        if value < 0xFD {
            1
        } else if value <= std::u16::MAX as usize {
            3
        } else if value <= std::u32::MAX as usize {
            5
        } else {
            9
        }
    }
}

impl Default for CompactInt {
    fn default() -> CompactInt {
        CompactInt::new()
    }
}

impl WireSerialize for CompactInt {
    fn wire_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        if self.value() < 0xFD {
            target.write_all(&[self.value() as u8])
        } else if self.value() <= std::u16::MAX as u64 {
            target.write_all(&[0xFD])?;
            target.write_u16::<LittleEndian>(self.value() as u16)
        } else if self.value() <= std::u32::MAX as u64 {
            target.write_all(&[0xFE])?;
            target.write_u32::<LittleEndian>(self.value() as u32)
        } else {
            target.write_all(&[0xFF])?;
            target.write_u64::<LittleEndian>(self.value())
        }
    }
}

impl WireDeserialize for CompactInt {
    fn wire_deserialize<R: std::io::Read>(mut reader: R) -> Result<CompactInt, DecodeError> {
        // A short buffer is a format violation here, not an io condition
        let first = reader.read_u8().map_err(|_| DecodeError::MalformedVarint)?;
        let value = match first {
            0xFD => reader
                .read_u16::<LittleEndian>()
                .map_err(|_| DecodeError::MalformedVarint)? as u64,
            0xFE => reader
                .read_u32::<LittleEndian>()
                .map_err(|_| DecodeError::MalformedVarint)? as u64,
            0xFF => reader
                .read_u64::<LittleEndian>()
                .map_err(|_| DecodeError::MalformedVarint)?,
            small => small as u64,
        };
        Ok(CompactInt(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: u64) -> Vec<u8> {
        let encoded = CompactInt(value).wire_serialize_to_vec().unwrap();
        let decoded = CompactInt::wire_deserialize(&encoded[..]).unwrap();
        assert_eq!(decoded.value(), value);
        encoded
    }

    #[test]
    fn width_boundaries() {
        assert_eq!(roundtrip(0).len(), 1);
        assert_eq!(roundtrip(0xFC).len(), 1);
        assert_eq!(roundtrip(0xFD).len(), 3);
        assert_eq!(roundtrip(0xFFFF).len(), 3);
        assert_eq!(roundtrip(0x1_0000).len(), 5);
        assert_eq!(roundtrip(0xFFFF_FFFF).len(), 5);
        assert_eq!(roundtrip(0x1_0000_0000).len(), 9);
        assert_eq!(roundtrip(std::u64::MAX).len(), 9);
    }

    #[test]
    fn size_matches_encoding() {
        for value in &[0u64, 0xFC, 0xFD, 0xFFFF, 0x1_0000, 0xFFFF_FFFF, 0x1_0000_0000] {
            let encoded = CompactInt(*value).wire_serialize_to_vec().unwrap();
            assert_eq!(CompactInt::size(*value as usize), encoded.len());
        }
    }

    #[test]
    fn truncated_input_is_malformed() {
        for bytes in &[&[0xFDu8, 0x01][..], &[0xFE, 0x01, 0x02][..], &[0xFF][..], &[][..]] {
            match CompactInt::wire_deserialize(&bytes[..]) {
                Err(DecodeError::MalformedVarint) => {}
                other => panic!("expected MalformedVarint, got {:?}", other),
            }
        }
    }
}
