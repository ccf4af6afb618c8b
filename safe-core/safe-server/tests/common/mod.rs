//! Simulated lock for controller tests

use std::time::Duration;

use safe_link::{DeviceLink, FakeDevice, LinkConfig};
use safe_model::ImageRecord;
use safe_server::LockController;

/// Lines the simulated lock emits while opening
pub const OPEN_PROGRESS: [&str; 3] = ["OK opening", "Opening 1", "Opening 2"];

/// Split a `:<verb>:<arg>:` command
fn parse(cmd: &str) -> Option<(&str, &str)> {
    let inner = cmd.strip_prefix(':')?.strip_suffix(':')?;
    inner.split_once(':')
}

/// Device behaving like the lock firmware
///
/// Holds one password; `lock` sets it, `test`, `unlock` and `clear` compare
/// against it. `open` streams `OPEN_PROGRESS` then the completion sentinel,
/// with an empty line in between.
pub fn simulated_lock() -> FakeDevice {
    let mut stored: Option<String> = None;
    FakeDevice::with_responder(move |cmd| {
        let Some((verb, arg)) = parse(cmd) else {
            return vec!["ERROR unknown command".to_string()];
        };
        let reply = |ok: bool, what: &str| {
            if ok {
                format!("OK {what}")
            } else {
                "ERROR bad password".to_string()
            }
        };
        match verb {
            "ping" => vec![format!("PINGACK:{arg}:")],
            "status" => vec![match &stored {
                Some(_) => "Status: locked".to_string(),
                None => "Status: unlocked".to_string(),
            }],
            "lock" => {
                stored = Some(arg.to_string());
                vec!["OK locked".to_string()]
            }
            "test" => vec![reply(stored.as_deref() == Some(arg), "password correct")],
            "unlock" => vec![reply(stored.as_deref() == Some(arg), "unlocked")],
            "clear" => {
                let ok = stored.as_deref() == Some(arg);
                if ok {
                    stored = None;
                }
                vec![reply(ok, "cleared")]
            }
            "open" => {
                let mut lines: Vec<String> = OPEN_PROGRESS.iter().map(|s| s.to_string()).collect();
                lines.push(String::new());
                lines.push("OK completed".to_string());
                lines
            }
            _ => vec!["ERROR unknown command".to_string()],
        }
    })
}

/// Small image usable as a lock template
pub fn template_image() -> ImageRecord {
    ImageRecord {
        comment: b"template".to_vec(),
        start_of_frame: vec![8, 0, 1, 0, 1, 1, 1, 0x11, 0],
        start_of_scan: vec![1, 1, 0, 0, 63, 0],
        quantization_tables: vec![vec![0; 65]],
        huffman_tables: vec![vec![0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 7]],
        scan_data: vec![0xf8, 0x00, 0x3f],
    }
}

pub fn controller(device: &FakeDevice) -> LockController<FakeDevice> {
    let link = DeviceLink::new(
        device.clone(),
        LinkConfig::default().with_settle(Duration::ZERO),
    );
    LockController::new(link, template_image())
}
