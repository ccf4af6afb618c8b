//! Device link timing and limits

use std::time::Duration;

/// Default settle interval between drain reads and before reading a reply
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(1);

/// Default number of ping attempts during sync
pub const DEFAULT_SYNC_ATTEMPTS: u32 = 5;

/// Default maximum length of one reply line
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

/// Timing and limits for a `DeviceLink`
///
/// The per-read timeout is a property of the stream (see `SerialSettings`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Pause after a drain read returned data, and between send and read
    pub settle: Duration,
    /// Ping attempts before sync gives up
    pub sync_attempts: u32,
    /// Drain rounds that returned data before giving up (`None` = keep draining)
    pub drain_max_rounds: Option<u32>,
    /// Longest unterminated line accepted
    pub max_line_len: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE,
            sync_attempts: DEFAULT_SYNC_ATTEMPTS,
            drain_max_rounds: None,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl LinkConfig {
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_sync_attempts(mut self, attempts: u32) -> Self {
        self.sync_attempts = attempts;
        self
    }

    pub fn with_drain_max_rounds(mut self, rounds: Option<u32>) -> Self {
        self.drain_max_rounds = rounds;
        self
    }

    pub fn with_max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len;
        self
    }
}
