//! Server configuration
//!
//! Read from a JSON file (default `~/.safe.cfg`) with PascalCase keys, then
//! overridden by command line flags. Keys missing from the file take their
//! defaults, and so do a zero `ListenPort` and an empty `SerialPort`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use safe_link::{LinkConfig, SerialSettings};
use serde::{Deserialize, Serialize};

/// Name of the configuration file in the home directory
pub const CONFIG_FILE_NAME: &str = ".safe.cfg";

pub const DEFAULT_LISTEN_PORT: u16 = 5000;
pub const DEFAULT_BAUD: u32 = 9600;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_OPEN_GRACE_SECS: u64 = 30;

/// Template image served to and carried back by the browser
pub const LOCK_IMAGE_FILE: &str = "lock_image.jpg";

#[cfg(windows)]
pub const DEFAULT_SERIAL_PORT: &str = "COM1";
#[cfg(not(windows))]
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SafeConfig {
    pub serial_port: String,
    pub listen_port: u16,
    /// Basic auth is off when empty
    pub auth_user: String,
    pub auth_pass: String,
    /// Static files and `lock_image.jpg`; empty means `<exe dir>/static`
    #[serde(rename = "HTMLDir")]
    pub html_dir: PathBuf,
    pub baud: u32,
    pub read_timeout_ms: u64,
    /// Drain rounds before the line is declared noisy; unset keeps draining
    pub drain_max_rounds: Option<u32>,
    /// Time allowed beyond the requested open duration
    pub open_grace_secs: u64,
}

impl Default for SafeConfig {
    fn default() -> Self {
        Self {
            serial_port: DEFAULT_SERIAL_PORT.to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            auth_user: String::new(),
            auth_pass: String::new(),
            html_dir: PathBuf::new(),
            baud: DEFAULT_BAUD,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            drain_max_rounds: None,
            open_grace_secs: DEFAULT_OPEN_GRACE_SECS,
        }
    }
}

/// Command line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub serial_port: Option<String>,
    pub listen_port: Option<u16>,
    pub html_dir: Option<PathBuf>,
}

impl SafeConfig {
    /// Load the configuration file at `path`
    ///
    /// A missing file yields the defaults. A file that is not valid JSON is
    /// an error.
    pub fn load(path: &Path) -> Result<Self> {
        let config: SafeConfig = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("Invalid configuration file {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "No configuration file at {}, using defaults",
                    path.display()
                );
                SafeConfig::default()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        Ok(config.with_defaults())
    }

    /// Apply command line overrides
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(port) = &overrides.serial_port {
            self.serial_port = port.clone();
        }
        if let Some(port) = overrides.listen_port {
            self.listen_port = port;
        }
        if let Some(dir) = &overrides.html_dir {
            self.html_dir = dir.clone();
        }
        self.with_defaults()
    }

    fn with_defaults(mut self) -> Self {
        if self.serial_port.is_empty() {
            self.serial_port = DEFAULT_SERIAL_PORT.to_string();
        }
        if self.listen_port == 0 {
            self.listen_port = DEFAULT_LISTEN_PORT;
        }
        if self.html_dir.as_os_str().is_empty() {
            self.html_dir = default_html_dir();
        }
        self
    }

    /// Basic auth is required
    pub fn auth_enabled(&self) -> bool {
        !self.auth_user.is_empty()
    }

    pub fn lock_image_path(&self) -> PathBuf {
        self.html_dir.join(LOCK_IMAGE_FILE)
    }

    pub fn serial_settings(&self) -> SerialSettings {
        let mut settings = SerialSettings::new(self.serial_port.clone());
        settings.baud_rate = self.baud;
        settings.read_timeout = Duration::from_millis(self.read_timeout_ms);
        settings
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::default().with_drain_max_rounds(self.drain_max_rounds)
    }

    pub fn open_grace(&self) -> Duration {
        Duration::from_secs(self.open_grace_secs)
    }
}

/// `~/.safe.cfg`
pub fn default_config_path() -> PathBuf {
    home_dir().join(CONFIG_FILE_NAME)
}

fn home_dir() -> PathBuf {
    if cfg!(windows) {
        if let (Ok(drive), Ok(path)) = (std::env::var("HOMEDRIVE"), std::env::var("HOMEPATH")) {
            return PathBuf::from(format!("{drive}{path}"));
        }
        if let Ok(profile) = std::env::var("USERPROFILE") {
            return PathBuf::from(profile);
        }
    } else if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home);
    }
    PathBuf::from(".")
}

/// `static` next to the executable, or relative to the working directory
/// when the executable path is unknown
fn default_html_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("static")))
        .unwrap_or_else(|| PathBuf::from("static"))
}
