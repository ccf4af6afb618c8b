//! Error types for safe-model

use core::fmt;

/// Error returned when an image cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Stream does not start with the start marker or end with the end marker
    BadHeaderOrFooter,
    /// A segment did not start with the marker prefix byte
    ExpectedMarker {
        /// Byte offset of the offending byte
        offset: usize,
    },
    /// A segment length field is smaller than the two length bytes
    BadLength { offset: usize, length: u16 },
    /// A segment runs past the end marker
    Truncated { offset: usize },
    /// The end marker was reached before a start-of-scan segment
    MissingScan,
    /// More than `MAX_TABLES` quantization table segments
    TooManyQuantizationTables,
    /// More than `MAX_TABLES` huffman table segments
    TooManyHuffmanTables,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::BadHeaderOrFooter => write!(f, "bad header or footer"),
            FormatError::ExpectedMarker { offset } => {
                write!(f, "expected marker at offset {offset}")
            }
            FormatError::BadLength { offset, length } => {
                write!(f, "bad segment length {length} at offset {offset}")
            }
            FormatError::Truncated { offset } => {
                write!(f, "segment at offset {offset} runs past end of image")
            }
            FormatError::MissingScan => write!(f, "no start of scan segment"),
            FormatError::TooManyQuantizationTables => {
                write!(f, "too many quantization segments")
            }
            FormatError::TooManyHuffmanTables => write!(f, "too many huffman segments"),
        }
    }
}

impl std::error::Error for FormatError {}

/// Error returned when a password or password image is rejected
///
/// The display strings are the exact messages shown to the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// Password is empty
    Missing,
    /// Password contains characters other than ASCII letters and digits
    InvalidCharacters,
    /// The two entered passwords differ
    Mismatch,
    /// Image comment does not carry a password
    NotPasswordImage,
}

impl fmt::Display for PasswordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordError::Missing => write!(f, "ERROR Missing password"),
            PasswordError::InvalidCharacters => write!(
                f,
                "ERROR Password contains invalid characters. Letters and numbers only"
            ),
            PasswordError::Mismatch => write!(f, "ERROR Passwords don't match"),
            PasswordError::NotPasswordImage => write!(f, "This is not a valid password image"),
        }
    }
}

impl std::error::Error for PasswordError {}
