//! Error types for safe-server

use core::fmt;

use safe_link::LinkError;
use safe_model::{FormatError, Password, PasswordError};

/// Error type for lock controller operations
///
/// Display strings are shown to the requester as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// Password rejected before reaching the device
    Validation(PasswordError),
    /// `open` duration is not a whole number of seconds; the text is kept
    /// for logs and left out of the message
    InvalidDuration(String),
    /// Uploaded image could not be decoded
    Image(FormatError),
    /// Serial link failure
    Link(LinkError),
    /// Device refused a generated password
    SetRejected { reply: String },
    /// Device accepted a generated password but failed to verify it
    TestRejected { reply: String, password: Password },
    /// Streamed exchange cancelled by the caller
    Cancelled,
    /// Streamed exchange ran past its deadline
    DeadlineExceeded,
    /// Link mutex poisoned by a panicking exchange
    LinkUnavailable,
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Validation(e) => write!(f, "{e}"),
            ControllerError::InvalidDuration(_) => {
                write!(f, "ERROR Invalid duration. Whole seconds only")
            }
            ControllerError::Image(e) => write!(f, "Could not parse JPEG file: {e}"),
            ControllerError::Link(e) => write!(f, "ERROR {e}"),
            ControllerError::SetRejected { reply } => {
                write!(f, "Error setting password: {reply}")
            }
            ControllerError::TestRejected { reply, password } => write!(
                f,
                "Error testing password: {reply}\nWe tried to set it to: {password}"
            ),
            ControllerError::Cancelled => write!(f, "ERROR Open cancelled"),
            ControllerError::DeadlineExceeded => {
                write!(f, "ERROR Open did not complete in time")
            }
            ControllerError::LinkUnavailable => write!(f, "ERROR Device link unavailable"),
        }
    }
}

impl std::error::Error for ControllerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ControllerError::Validation(e) => Some(e),
            ControllerError::Image(e) => Some(e),
            ControllerError::Link(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PasswordError> for ControllerError {
    fn from(e: PasswordError) -> Self {
        ControllerError::Validation(e)
    }
}

impl From<FormatError> for ControllerError {
    fn from(e: FormatError) -> Self {
        ControllerError::Image(e)
    }
}

impl From<LinkError> for ControllerError {
    fn from(e: LinkError) -> Self {
        ControllerError::Link(e)
    }
}
