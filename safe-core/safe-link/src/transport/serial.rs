//! Serial port byte stream

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use super::ByteStream;
use crate::error::TransportError;

/// Serial port parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Port name (e.g. `/dev/ttyUSB0`, `COM4`)
    pub path: String,
    pub baud_rate: u32,
    /// How long a single read waits for data
    pub read_timeout: Duration,
}

impl SerialSettings {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: 9600,
            read_timeout: Duration::from_millis(100),
        }
    }
}

/// Byte stream over a serial port
pub struct SerialStream {
    port: Option<Box<dyn SerialPort>>,
    path: String,
}

impl SerialStream {
    /// Open the serial port described by `settings`
    pub fn open(settings: &SerialSettings) -> Result<Self, TransportError> {
        let port = serialport::new(&settings.path, settings.baud_rate)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|e| TransportError::Open {
                path: settings.path.clone(),
                reason: e.to_string(),
            })?;
        log::debug!(
            "Opened {} @ {} baud, read timeout {:?}",
            settings.path,
            settings.baud_rate,
            settings.read_timeout
        );
        Ok(Self {
            port: Some(port),
            path: settings.path.clone(),
        })
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port.as_mut().ok_or(TransportError::Closed)
    }
}

impl ByteStream for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.port()?.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(0),
            Err(e) => Err(TransportError::Io(e.to_string())),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port()?;
        port.write_all(data)
            .and_then(|()| port.flush())
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.port.take().is_some() {
            log::debug!("Closed {}", self.path);
        }
        Ok(())
    }
}
