//! Lock command surface
//!
//! `LockController` owns the device link behind a mutex and runs each
//! operation as one uninterrupted exchange: drain, command, reply, and for
//! `open` the whole progress stream up to `OK completed`.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use safe_link::{ByteStream, CancelToken, DeviceLink, LinkError};
use safe_model::command::parse_open_seconds;
use safe_model::{
    Command, ImageRecord, OPEN_COMPLETED, Password, UnlockMode, is_ok_reply, password_comment,
    password_from_image,
};

use crate::error::ControllerError;

/// Extra time allowed beyond the requested open duration
pub const DEFAULT_OPEN_GRACE: Duration = Duration::from_secs(30);

/// Content type of a downloaded password image
pub const PASSWORD_IMAGE_CONTENT_TYPE: &str = "binary/octet-stream";

/// A streamed `open` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenRequest {
    pub seconds: u32,
    /// Time allowed beyond `seconds` before the stream is abandoned
    pub grace: Duration,
}

impl OpenRequest {
    pub fn new(seconds: u32) -> Self {
        Self {
            seconds,
            grace: DEFAULT_OPEN_GRACE,
        }
    }

    /// Parse a duration entered as text; empty selects the default
    pub fn parse(text: &str) -> Result<Self, ControllerError> {
        parse_open_seconds(text)
            .map(Self::new)
            .ok_or_else(|| ControllerError::InvalidDuration(text.to_string()))
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    fn time_limit(&self) -> Duration {
        Duration::from_secs(u64::from(self.seconds)) + self.grace
    }
}

/// How a streamed `open` ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// Device refused with this reply
    Refused(String),
    /// Sentinel line received
    Completed,
}

/// Replies to setting and then verifying a password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockReport {
    pub set_reply: String,
    pub test_reply: String,
}

/// A freshly set random password and the image carrying it
#[derive(Debug, Clone)]
pub struct PasswordImage {
    pub password: Password,
    /// Encoded image
    pub bytes: Vec<u8>,
    /// Suggested download name, `safe-YYYYMMDD-HHMMSS.jpg`
    pub filename: String,
}

/// Lock operations over a shared device link
pub struct LockController<S: ByteStream> {
    link: Mutex<DeviceLink<S>>,
    /// Template for produced password images
    lock_image: ImageRecord,
}

impl<S: ByteStream> LockController<S> {
    /// Create a controller
    ///
    /// # Arguments
    /// * `link` - Link to the lock, synced or not
    /// * `lock_image` - Template whose comment is replaced in produced images
    pub fn new(link: DeviceLink<S>, lock_image: ImageRecord) -> Self {
        Self {
            link: Mutex::new(link),
            lock_image,
        }
    }

    pub fn lock_image(&self) -> &ImageRecord {
        &self.lock_image
    }

    fn link(&self) -> Result<MutexGuard<'_, DeviceLink<S>>, ControllerError> {
        self.link.lock().map_err(|_| {
            warn!("Device link mutex poisoned");
            ControllerError::LinkUnavailable
        })
    }

    /// Run the ping handshake
    pub fn sync(&self) -> Result<u32, ControllerError> {
        Ok(self.link()?.sync()?)
    }

    /// Free-form status text from the device
    pub fn status(&self) -> Result<String, ControllerError> {
        Ok(self.link()?.send_read(&Command::Status)?)
    }

    /// Open the lock, forwarding progress lines to `observer`
    ///
    /// The first reply is always forwarded. If it starts with `OK`, lines are
    /// read and forwarded (empty ones skipped) until `OK completed`. Read
    /// timeouts inside the stream are waited out; `cancel` and the request's
    /// time limit are checked before every read.
    pub fn open<F>(
        &self,
        request: OpenRequest,
        cancel: &CancelToken,
        mut observer: F,
    ) -> Result<OpenOutcome, ControllerError>
    where
        F: FnMut(&str),
    {
        let mut link = self.link()?;
        let started = Instant::now();
        let limit = request.time_limit();

        let mut line = link.send_read(&Command::Open(request.seconds))?;
        observer(&line);
        if !is_ok_reply(&line) {
            return Ok(OpenOutcome::Refused(line));
        }

        debug!("Looping on input");
        while line != OPEN_COMPLETED {
            if cancel.is_cancelled() {
                warn!("Open cancelled before completion");
                return Err(ControllerError::Cancelled);
            }
            if started.elapsed() >= limit {
                warn!("Open still streaming after {limit:?}");
                return Err(ControllerError::DeadlineExceeded);
            }
            line = match link.read_line() {
                Ok(line) => line,
                Err(LinkError::Timeout { partial }) => partial,
                Err(e) => return Err(e.into()),
            };
            if !line.is_empty() {
                observer(&line);
            }
        }
        debug!("Loop done");
        Ok(OpenOutcome::Completed)
    }

    /// Set a password entered twice, then verify it
    ///
    /// Nothing is sent if the entries differ or are invalid.
    pub fn lock(&self, first: &str, second: &str) -> Result<LockReport, ControllerError> {
        let password = Password::confirm(first, second)?;
        let mut link = self.link()?;
        let set_reply = link.send_read(&Command::Lock(password.clone()))?;
        let test_reply = link.send_read(&Command::Password(UnlockMode::Test, password))?;
        Ok(LockReport {
            set_reply,
            test_reply,
        })
    }

    /// Send an unlock, clear or test command with a typed password
    pub fn unlock(&self, mode: UnlockMode, password: &str) -> Result<String, ControllerError> {
        let password = Password::parse(password)?;
        self.send_password(mode, password)
    }

    /// Send an unlock, clear or test command with the password carried by an image
    pub fn unlock_with_image(
        &self,
        mode: UnlockMode,
        image: &[u8],
    ) -> Result<String, ControllerError> {
        let image = safe_model::decode(image)?;
        let password = password_from_image(&image)?;
        self.send_password(mode, password)
    }

    fn send_password(&self, mode: UnlockMode, password: Password) -> Result<String, ControllerError> {
        Ok(self
            .link()?
            .send_read(&Command::Password(mode, password))?)
    }

    /// Lock with a random password and return it embedded in an image
    ///
    /// The device must answer `OK` to both setting and verifying the password;
    /// otherwise no image is produced.
    pub fn random_lock(&self) -> Result<PasswordImage, ControllerError> {
        let password = Password::random(&mut rand::thread_rng());
        {
            let mut link = self.link()?;
            let reply = link.send_read(&Command::Lock(password.clone()))?;
            if !is_ok_reply(&reply) {
                return Err(ControllerError::SetRejected { reply });
            }
            let reply = link.send_read(&Command::Password(UnlockMode::Test, password.clone()))?;
            if !is_ok_reply(&reply) {
                return Err(ControllerError::TestRejected { reply, password });
            }
        }
        info!("Random password set and verified");

        let image = self.lock_image.with_comment(password_comment(&password));
        Ok(PasswordImage {
            password,
            bytes: image.to_bytes(),
            filename: image_filename(chrono::Local::now()),
        })
    }

    /// Close the link
    pub fn close(&self) -> Result<(), ControllerError> {
        Ok(self.link()?.close()?)
    }
}

/// Download name for a password image created at `at`
pub fn image_filename<Tz: chrono::TimeZone>(at: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("safe-{}.jpg", at.format("%Y%m%d-%H%M%S"))
}
