//! Lock passwords and the password image convention
//!
//! Passwords travel inside colon-delimited device commands, so only ASCII
//! letters and digits are accepted. A password image is any image whose
//! comment segment reads `LOCKPSW:<password>`.

use core::fmt;

use rand::Rng;

use crate::error::PasswordError;
use crate::image::ImageRecord;

/// Characters allowed in a password
pub const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of generated passwords
pub const RANDOM_PASSWORD_LEN: usize = 30;

/// Comment prefix marking a password image
pub const COMMENT_PREFIX: &str = "LOCKPSW:";

/// A validated password
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Validate a password
    ///
    /// # Returns
    /// * `Err(PasswordError::Missing)` for an empty string
    /// * `Err(PasswordError::InvalidCharacters)` for anything but ASCII letters and digits
    pub fn parse(s: &str) -> Result<Self, PasswordError> {
        if s.is_empty() {
            return Err(PasswordError::Missing);
        }
        if !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(PasswordError::InvalidCharacters);
        }
        Ok(Self(s.to_string()))
    }

    /// Validate a password entered twice
    ///
    /// The mismatch check comes first, so two different invalid entries
    /// report the mismatch.
    pub fn confirm(first: &str, second: &str) -> Result<Self, PasswordError> {
        if first != second {
            return Err(PasswordError::Mismatch);
        }
        Self::parse(first)
    }

    /// Generate a random password of `RANDOM_PASSWORD_LEN` characters
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let s = (0..RANDOM_PASSWORD_LEN)
            .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
            .collect();
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Kept out of logs by default
impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password(<{} chars>)", self.0.len())
    }
}

/// Comment bytes that embed `password` in an image
pub fn password_comment(password: &Password) -> Vec<u8> {
    format!("{COMMENT_PREFIX}{password}").into_bytes()
}

/// Extract the password carried by an image comment
///
/// # Returns
/// * `Err(PasswordError::NotPasswordImage)` if the comment lacks the prefix
/// * the validation error if the embedded password is not acceptable
pub fn password_from_image(image: &ImageRecord) -> Result<Password, PasswordError> {
    let comment = core::str::from_utf8(&image.comment)
        .map_err(|_| PasswordError::NotPasswordImage)?;
    let psw = comment
        .strip_prefix(COMMENT_PREFIX)
        .ok_or(PasswordError::NotPasswordImage)?;
    Password::parse(psw)
}
