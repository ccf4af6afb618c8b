//! Error types for safe-link

use core::fmt;

/// Error raised by a byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The port could not be opened
    Open { path: String, reason: String },
    /// Read or write failed
    Io(String),
    /// The stream was closed
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Open { path, reason } => {
                write!(f, "Could not open serial port {path}: {reason}")
            }
            TransportError::Io(msg) => write!(f, "I/O error: {msg}"),
            TransportError::Closed => write!(f, "stream closed"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Error raised by the device link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Underlying stream failed
    Transport(TransportError),
    /// No line terminator arrived within the read timeout
    Timeout {
        /// Unterminated text received before the timeout, already discarded from the link
        partial: String,
    },
    /// No matching ping acknowledgement within the attempt budget
    HandshakeFailed { attempts: u32 },
    /// Drain gave up while the device was still sending
    Noisy { rounds: u32 },
    /// A line grew past the configured maximum without a terminator
    LineTooLong { len: usize },
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Transport(e) => write!(f, "{e}"),
            LinkError::Timeout { partial } if partial.is_empty() => {
                write!(f, "timed out waiting for reply")
            }
            LinkError::Timeout { partial } => {
                write!(f, "timed out waiting for end of line after {partial:?}")
            }
            LinkError::HandshakeFailed { attempts } => {
                write!(f, "Failed to connect to safe after {attempts} attempts")
            }
            LinkError::Noisy { rounds } => {
                write!(f, "device still sending after {rounds} drain rounds")
            }
            LinkError::LineTooLong { len } => {
                write!(f, "reply line exceeded {len} bytes without a terminator")
            }
        }
    }
}

impl std::error::Error for LinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LinkError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for LinkError {
    fn from(e: TransportError) -> Self {
        LinkError::Transport(e)
    }
}
