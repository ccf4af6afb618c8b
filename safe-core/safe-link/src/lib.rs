//! Serial link to the lock.
//!
//! This crate turns an unreliable half-duplex byte stream into single-shot
//! request/response exchanges:
//! - `transport`: the `ByteStream` abstraction, a serial port implementation
//!   and a scripted fake device
//! - `link`: `DeviceLink` with drain, send, line reads and the ping handshake
//! - `cancel`: a shared flag for interrupting long exchanges

pub mod cancel;
pub mod config;
pub mod error;
pub mod link;
pub mod transport;

pub use cancel::CancelToken;
pub use config::LinkConfig;
pub use error::{LinkError, TransportError};
pub use link::{DeviceLink, LinkState};
pub use transport::{ByteStream, FakeDevice, SerialSettings, SerialStream};
