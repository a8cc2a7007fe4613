use std::io;

use thiserror::Error;

/// An error that prevented decoding a wire-format value.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// An io error that prevented deserialization
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// A variable-length integer was shorter than its marker byte requires.
    #[error("malformed varint")]
    MalformedVarint,
    /// A transaction was truncated or declared inconsistent lengths.
    #[error("malformed transaction: {0}")]
    MalformedTx(&'static str),
    /// Any other wire-format violation.
    #[error("parse error: {0}")]
    Parse(&'static str),
}
