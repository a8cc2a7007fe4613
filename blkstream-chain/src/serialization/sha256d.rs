//! Double-SHA256, the hash Bitcoin uses to identify blocks and transactions.

use sha2::{Digest, Sha256};

/// The double-SHA256 digest of `data`.
///
/// Purely computational; safe to call from any thread without coordination.
pub fn hash(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(&first);
    let mut output = [0u8; 32];
    output.copy_from_slice(&second);
    output
}

/// A wrapper around `sha2::Sha256` that implements `std::io::Write`, so wire
/// serialization can stream straight into the digest.
#[derive(Default)]
pub struct Writer {
    hash: Sha256,
}

impl Writer {
    /// Consume the writer, returning the double-SHA256 of everything written.
    pub fn finish(self) -> [u8; 32] {
        let first = self.hash.finalize();
        let second = Sha256::digest(&first);
        let mut output = [0u8; 32];
        output.copy_from_slice(&second);
        output
    }
}

impl std::io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> Result<usize, std::io::Error> {
        self.hash.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), std::io::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_input() {
        // sha256d of the empty string, a fixed reference value
        let expected =
            hex::decode("5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456")
                .unwrap();
        assert_eq!(hash(b"")[..], expected[..]);
    }

    #[test]
    fn writer_matches_one_shot() {
        let data = b"the quick brown fox";
        let mut writer = Writer::default();
        writer.write_all(&data[..5]).unwrap();
        writer.write_all(&data[5..]).unwrap();
        assert_eq!(writer.finish(), hash(data));
    }
}
