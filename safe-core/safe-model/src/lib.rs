//! Data model for the safe lock controller.
//!
//! This crate has no I/O. It provides:
//! - The narrow JPEG segment codec used to carry lock passwords (`image`)
//! - Password validation and the `LOCKPSW:` comment convention (`password`)
//! - Device wire commands and reply helpers (`command`)

pub mod command;
pub mod error;
pub mod image;
pub mod password;

pub use command::{Command, OPEN_COMPLETED, UnlockMode, is_ok_reply, ping_ack};
pub use error::{FormatError, PasswordError};
pub use image::{ImageRecord, decode, encode};
pub use password::{Password, password_comment, password_from_image};
