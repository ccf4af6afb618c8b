//! Raw byte streams under the device link

pub mod fake;
pub mod serial;

pub use fake::FakeDevice;
pub use serial::{SerialSettings, SerialStream};

use crate::error::TransportError;

/// Half-duplex byte stream to the lock
///
/// Implementations are opened by their own constructors and owned by a
/// `DeviceLink` until `close()`.
pub trait ByteStream: Send {
    /// Read whatever bytes are available
    ///
    /// Waits at most the stream's read timeout.
    ///
    /// # Returns
    ///
    /// * `Ok(n)` with `n > 0` if bytes were read
    /// * `Ok(0)` if nothing arrived before the timeout
    /// * `Err(TransportError)` if the stream failed
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write all of `data`
    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Release the stream
    fn close(&mut self) -> Result<(), TransportError>;
}

impl<S: ByteStream + ?Sized> ByteStream for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).write_all(data)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }
}
