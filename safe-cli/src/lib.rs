//! Safe CLI library.
//!
//! This library exposes the CLI functionality for use in tests and as a library.
//! It provides:
//! - The `serve` command: configuration, startup and the HTTP front end
//! - Logger setup
//! - Console messages

pub mod commands;
pub mod config;
pub mod logging;
pub mod messages;

pub use config::SafeConfig;
