//! Scripted fake device for testing without hardware
//!
//! Every `write_all` is treated as one complete command. The optional
//! responder sees the command text and returns reply lines, which are queued
//! (CR/LF terminated) for later reads. Reads never block: an empty queue
//! reads as a timeout.
//!
//! Clones share the same device, so a test can keep one clone to inject
//! bytes and inspect traffic while the link owns the other.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::ByteStream;
use crate::error::TransportError;

type Responder = Box<dyn FnMut(&str) -> Vec<String> + Send>;

struct FakeState {
    /// Bytes the device has emitted and the host has not read yet
    outgoing: VecDeque<u8>,
    /// Commands written by the host, in order
    commands: Vec<String>,
    responder: Option<Responder>,
    /// Maximum bytes returned per read (0 = no limit)
    chunk_size: usize,
    closed: bool,
}

/// Fake lock device
#[derive(Clone)]
pub struct FakeDevice {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDevice {
    /// Device that never answers
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                outgoing: VecDeque::new(),
                commands: Vec::new(),
                responder: None,
                chunk_size: 0,
                closed: false,
            })),
        }
    }

    /// Device that answers each command with the lines returned by `responder`
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: FnMut(&str) -> Vec<String> + Send + 'static,
    {
        let device = Self::new();
        device.state().responder = Some(Box::new(responder));
        device
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Limit how many bytes a single read returns
    pub fn set_chunk_size(&self, chunk_size: usize) {
        self.state().chunk_size = chunk_size;
    }

    /// Queue raw bytes as if the device had sent them
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.state().outgoing.extend(bytes);
    }

    /// Queue a CR/LF terminated line
    pub fn push_line(&self, line: &str) {
        let mut state = self.state();
        state.outgoing.extend(line.as_bytes());
        state.outgoing.extend(b"\r\n");
    }

    /// Commands written so far
    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    /// Bytes queued and not yet read
    pub fn unread(&self) -> usize {
        self.state().outgoing.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

impl ByteStream for FakeDevice {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut state = self.state();
        if state.closed {
            return Err(TransportError::Closed);
        }
        let mut limit = buf.len().min(state.outgoing.len());
        if state.chunk_size > 0 {
            limit = limit.min(state.chunk_size);
        }
        for (slot, byte) in buf.iter_mut().zip(state.outgoing.drain(..limit)) {
            *slot = byte;
        }
        Ok(limit)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.closed {
            return Err(TransportError::Closed);
        }
        let command = String::from_utf8_lossy(data).into_owned();
        let replies = match state.responder.as_mut() {
            Some(responder) => responder(&command),
            None => Vec::new(),
        };
        for reply in replies {
            state.outgoing.extend(reply.as_bytes());
            state.outgoing.extend(b"\r\n");
        }
        state.commands.push(command);
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.state().closed = true;
        Ok(())
    }
}
