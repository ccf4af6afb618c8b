//! Lock controller for the safe.
//!
//! Composes the serial link with the password image codec into the command
//! surface used by the HTTP layer: open, lock, unlock, clear, test, status and
//! random password images.

pub mod controller;
pub mod error;

pub use controller::{
    LockController, LockReport, OpenOutcome, OpenRequest, PASSWORD_IMAGE_CONTENT_TYPE,
    PasswordImage,
};
pub use error::ControllerError;
