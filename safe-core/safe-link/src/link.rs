//! Request/response exchanges over the half-duplex serial link
//!
//! The lock may emit stray bytes when the port opens or after an exchange
//! stalled, and its replies carry no request identifier. Every command is
//! therefore preceded by a drain, and the session starts with a nonce-tagged
//! ping handshake.

use std::thread;

use log::{debug, info, trace, warn};
use safe_model::{Command, ping_ack};

use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::transport::ByteStream;

/// Bytes requested per drain read
const DRAIN_CHUNK: usize = 128;

/// Bytes requested per line read
const READ_CHUNK: usize = 128;

/// Session state of a `DeviceLink`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Opened, no handshake yet (or the last handshake failed)
    Idle,
    /// Discarding unsolicited bytes
    Draining,
    /// Ping handshake in progress
    Syncing,
    /// Handshake succeeded
    Connected,
}

/// Exclusive owner of the byte stream to the lock
///
/// A link serves one exchange at a time; callers sharing it across threads
/// must hold a lock for the whole exchange.
pub struct DeviceLink<S: ByteStream> {
    stream: S,
    config: LinkConfig,
    /// Received bytes not yet returned as a line
    buffer: Vec<u8>,
    state: LinkState,
}

impl<S: ByteStream> DeviceLink<S> {
    pub fn new(stream: S, config: LinkConfig) -> Self {
        Self {
            stream,
            config,
            buffer: Vec::new(),
            state: LinkState::Idle,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Discard everything the device has sent so far
    ///
    /// Reads until a read returns nothing or fails, pausing `settle` after
    /// each read that returned data so a slow burst can finish. Bytes that
    /// arrive after the final empty read are left alone.
    ///
    /// # Returns
    ///
    /// * `Ok(n)` with the number of bytes discarded
    /// * `Err(LinkError::Noisy)` if `drain_max_rounds` reads in a row returned data
    pub fn drain(&mut self) -> Result<usize, LinkError> {
        let resume = self.state;
        self.state = LinkState::Draining;

        let mut discarded = self.buffer.len();
        self.buffer.clear();

        let mut buf = [0u8; DRAIN_CHUNK];
        let mut rounds = 0;
        loop {
            trace!("Discarding any rogue data");
            let n = match self.stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!("Drain stopped on read error: {e}");
                    break;
                }
            };
            discarded += n;
            rounds += 1;
            debug!("Discarded {n} bytes");
            if self.config.drain_max_rounds.is_some_and(|max| rounds >= max) {
                self.state = resume;
                return Err(LinkError::Noisy { rounds });
            }
            thread::sleep(self.config.settle);
        }

        self.state = resume;
        Ok(discarded)
    }

    /// Drain, then write `command`
    pub fn send(&mut self, command: &Command) -> Result<(), LinkError> {
        self.drain()?;
        debug!("Sending {command}");
        self.stream.write_all(command.to_wire().as_bytes())?;
        Ok(())
    }

    /// Read one line, with trailing CR/LF removed
    ///
    /// # Returns
    ///
    /// * `Ok(line)` if a line feed arrived
    /// * `Err(LinkError::Timeout { partial })` if a read timed out first; the
    ///   partial text is removed from the link
    /// * `Err(LinkError::LineTooLong)` if `max_line_len` bytes arrived without a line feed
    pub fn read_line(&mut self) -> Result<String, LinkError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                let line = trim_line(&line);
                debug!("Received {line}");
                return Ok(line);
            }

            if self.buffer.len() > self.config.max_line_len {
                let len = self.buffer.len();
                self.buffer.clear();
                return Err(LinkError::LineTooLong { len });
            }

            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                let partial = trim_line(&self.buffer);
                self.buffer.clear();
                debug!("No LF received, partial {partial:?}");
                return Err(LinkError::Timeout { partial });
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Send `command`, wait `settle`, and read one reply line
    ///
    /// A reply without a terminator is returned as is (possibly empty);
    /// single-shot exchanges are not retried.
    pub fn send_read(&mut self, command: &Command) -> Result<String, LinkError> {
        self.send(command)?;
        thread::sleep(self.config.settle);
        match self.read_line() {
            Ok(line) => Ok(line),
            Err(LinkError::Timeout { partial }) => {
                warn!("No complete reply to {command}, got {partial:?}");
                Ok(partial)
            }
            Err(e) => Err(e),
        }
    }

    /// Ping handshake
    ///
    /// Each attempt pings with a fresh random nonce and reads lines until one
    /// ends with the matching `PINGACK:<nonce>:` or a read times out.
    /// Acknowledgements for earlier nonces are discarded. A drain that gives
    /// up on a noisy line uses up the attempt without sending.
    ///
    /// # Returns
    ///
    /// * `Ok(attempt)` with the 1-based attempt that succeeded
    /// * `Err(LinkError::HandshakeFailed)` once `sync_attempts` are used up
    pub fn sync(&mut self) -> Result<u32, LinkError> {
        self.state = LinkState::Syncing;
        let result = self.sync_attempts();
        self.state = match result {
            Ok(_) => LinkState::Connected,
            Err(_) => LinkState::Idle,
        };
        result
    }

    fn sync_attempts(&mut self) -> Result<u32, LinkError> {
        let attempts = self.config.sync_attempts;
        for attempt in 1..=attempts {
            let nonce: u64 = rand::random();
            let ack = ping_ack(nonce);
            debug!("Attempt {attempt} connecting to safe");
            match self.send(&Command::Ping(nonce)) {
                Ok(()) => {}
                Err(e @ LinkError::Noisy { .. }) => {
                    warn!("Attempt {attempt} not sent: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            }

            loop {
                let (line, timed_out) = match self.read_line() {
                    Ok(line) => (line, false),
                    Err(LinkError::Timeout { partial }) => (partial, true),
                    Err(e) => return Err(e),
                };
                if line.ends_with(&ack) {
                    info!("Successful PINGACK received on attempt {attempt}");
                    return Ok(attempt);
                }
                if timed_out {
                    break;
                }
                debug!("Discarding {line}");
            }
        }
        warn!("No PINGACK after {attempts} attempts");
        Err(LinkError::HandshakeFailed { attempts })
    }

    /// Close the underlying stream
    pub fn close(&mut self) -> Result<(), LinkError> {
        self.buffer.clear();
        self.state = LinkState::Idle;
        self.stream.close()?;
        Ok(())
    }
}

fn trim_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}
