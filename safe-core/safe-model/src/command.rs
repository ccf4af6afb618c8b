//! Device wire commands
//!
//! Commands are `:<verb>:<arg>:` with no terminator; the device reads until it
//! sees the closing colon. Replies are newline-terminated lines starting with
//! `OK` on success.

use core::fmt;

use crate::password::Password;

/// Last line of a streamed `open` exchange
pub const OPEN_COMPLETED: &str = "OK completed";

/// Default `open` duration in seconds
pub const DEFAULT_OPEN_SECONDS: u32 = 5;

/// Password commands that share the `:<verb>:<password>:` shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockMode {
    /// Single unlock attempt
    Unlock,
    /// Unlock and clear the stored password
    Clear,
    /// Verify the password without unlocking
    Test,
}

impl UnlockMode {
    pub fn verb(self) -> &'static str {
        match self {
            UnlockMode::Unlock => "unlock",
            UnlockMode::Clear => "clear",
            UnlockMode::Test => "test",
        }
    }
}

/// A command understood by the lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Handshake probe; the device echoes `PINGACK:<nonce>:`
    Ping(u64),
    Status,
    /// Open for the given number of seconds, streaming progress lines
    Open(u32),
    /// Set the unlock password
    Lock(Password),
    Password(UnlockMode, Password),
}

impl Command {
    /// Verb and argument of this command
    fn parts(&self) -> (&'static str, String) {
        match self {
            Command::Ping(nonce) => ("ping", nonce.to_string()),
            Command::Status => ("status", String::new()),
            Command::Open(seconds) => ("open", seconds.to_string()),
            Command::Lock(psw) => ("lock", psw.to_string()),
            Command::Password(mode, psw) => (mode.verb(), psw.to_string()),
        }
    }

    /// Bytes sent to the device
    pub fn to_wire(&self) -> String {
        let (verb, arg) = self.parts();
        format!(":{verb}:{arg}:")
    }
}

impl fmt::Display for Command {
    /// Wire form with any password masked, for logging
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Lock(_) | Command::Password(..) => write!(f, ":{}:***:", self.parts().0),
            _ => f.write_str(&self.to_wire()),
        }
    }
}

/// Acknowledgement suffix expected for a ping carrying `nonce`
pub fn ping_ack(nonce: u64) -> String {
    format!("PINGACK:{nonce}:")
}

/// Whether a reply line reports success
pub fn is_ok_reply(line: &str) -> bool {
    line.starts_with("OK")
}

/// Parse an `open` duration given as text
///
/// Empty input selects `DEFAULT_OPEN_SECONDS`.
pub fn parse_open_seconds(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return Some(DEFAULT_OPEN_SECONDS);
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn psw(s: &str) -> Password {
        Password::parse(s).unwrap()
    }

    #[test]
    fn test_wire_forms() {
        assert_eq!(Command::Ping(42).to_wire(), ":ping:42:");
        assert_eq!(Command::Status.to_wire(), ":status::");
        assert_eq!(Command::Open(5).to_wire(), ":open:5:");
        assert_eq!(Command::Lock(psw("abc")).to_wire(), ":lock:abc:");
        assert_eq!(
            Command::Password(UnlockMode::Unlock, psw("abc")).to_wire(),
            ":unlock:abc:"
        );
        assert_eq!(
            Command::Password(UnlockMode::Clear, psw("abc")).to_wire(),
            ":clear:abc:"
        );
        assert_eq!(
            Command::Password(UnlockMode::Test, psw("abc")).to_wire(),
            ":test:abc:"
        );
    }

    #[test]
    fn test_display_masks_password() {
        assert_eq!(Command::Lock(psw("abc")).to_string(), ":lock:***:");
        assert_eq!(Command::Status.to_string(), ":status::");
    }

    #[test]
    fn test_replies() {
        assert!(is_ok_reply("OK"));
        assert!(is_ok_reply(OPEN_COMPLETED));
        assert!(!is_ok_reply("ERROR bad password"));
        assert!(!is_ok_reply(""));
        assert_eq!(ping_ack(9), "PINGACK:9:");
    }

    #[test]
    fn test_parse_open_seconds() {
        assert_eq!(parse_open_seconds(""), Some(5));
        assert_eq!(parse_open_seconds("12"), Some(12));
        assert_eq!(parse_open_seconds("1:2"), None);
        assert_eq!(parse_open_seconds("-3"), None);
        assert_eq!(parse_open_seconds("99999999999"), None);
    }
}
