//! Format error types

use std::fmt;

use thiserror::Error;

/// How an LZ stream went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzCorruption {
    /// A token needed more input than the stream holds
    EndedEarly,
    /// The end marker was reached with input left over
    TrailingGarbage,
    /// A back-reference points before the start of the output
    LookbackOutOfRange,
}

impl fmt::Display for LzCorruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndedEarly => f.write_str("ended early"),
            Self::TrailingGarbage => f.write_str("trailing garbage"),
            Self::LookbackOutOfRange => f.write_str("lookback out of range"),
        }
    }
}

/// Error type for every archive decoder
#[derive(Debug, Error)]
pub enum FormatError {
    /// Bad magic, unknown tag or inconsistent header
    #[error("malformed container: {0}")]
    MalformedContainer(String),

    /// A stream produced or held fewer or more bytes than declared
    #[error("truncated stream: expected {expected} bytes, got {actual}")]
    TruncatedStream {
        /// Declared byte count
        expected: usize,
        /// Byte count actually available or produced
        actual: usize,
    },

    /// A declared offset lies beyond the end of its file
    #[error("dangling reference: offset {offset} beyond length {length}")]
    DanglingReference {
        /// Declared offset
        offset: u64,
        /// Length of the file or buffer
        length: u64,
    },

    /// Computed hash disagrees with the declared one
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Declared hash (upper hex)
        expected: String,
        /// Computed hash (upper hex)
        actual: String,
    },

    /// Proprietary LZ stream corruption
    #[error("corrupt LZ stream ({kind}) at input byte {consumed} of {total}")]
    Corrupt {
        /// What went wrong
        kind: LzCorruption,
        /// Input bytes consumed when decoding stopped
        consumed: usize,
        /// Total input length
        total: usize,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

impl FormatError {
    /// Shorthand for [`FormatError::MalformedContainer`]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedContainer(message.into())
    }
}

/// Result alias for format operations
pub type Result<T> = std::result::Result<T, FormatError>;
