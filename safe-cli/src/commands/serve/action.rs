//! Form actions on `/safe/`
//!
//! A request carries one action, picked by the first non-empty field in
//! `ACTION_ORDER`. Replies are HTML fragments, one `<br>`-terminated line per
//! message, except for `random` which produces a file download.

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, warn};
use safe_link::{ByteStream, CancelToken};
use safe_model::UnlockMode;
use safe_server::{LockController, OpenOutcome, OpenRequest, PasswordImage};

/// Multipart field holding an uploaded password image
pub const FILE_FIELD: &str = "fileToUpload";

/// Action fields in dispatch order
pub const ACTION_ORDER: [&str; 10] = [
    "status",
    "open",
    "unlock_1",
    "unlock_all",
    "pwtest",
    "lock",
    "random",
    "image_test",
    "image_unlock_1",
    "image_unlock_all",
];

/// Submitted form fields and the optional uploaded file
#[derive(Debug, Clone, Default)]
pub struct FormInput {
    pub fields: HashMap<String, String>,
    pub file: Option<Vec<u8>>,
}

impl FormInput {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields, file: None }
    }

    pub fn with_file(mut self, file: Vec<u8>) -> Self {
        self.file = Some(file);
        self
    }

    /// Field value, empty if absent
    pub fn value(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    fn is_set(&self, name: &str) -> bool {
        !self.value(name).is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafeAction {
    Status,
    Open { duration: String },
    Unlock { mode: UnlockMode, password: String },
    Lock { first: String, second: String },
    Random,
    ImageUnlock { mode: UnlockMode, image: Option<Vec<u8>> },
    Unknown,
}

impl SafeAction {
    /// Pick the action requested by `form`
    pub fn from_form(form: FormInput) -> Self {
        let Some(name) = ACTION_ORDER.iter().find(|name| form.is_set(name)) else {
            return SafeAction::Unknown;
        };
        let typed = |mode| SafeAction::Unlock {
            mode,
            password: form.value("unlock").to_string(),
        };
        let uploaded = |mode| SafeAction::ImageUnlock {
            mode,
            image: form.file.clone().filter(|bytes| !bytes.is_empty()),
        };
        match *name {
            "status" => SafeAction::Status,
            "open" => SafeAction::Open {
                duration: form.value("duration").to_string(),
            },
            "unlock_1" => typed(UnlockMode::Unlock),
            "unlock_all" => typed(UnlockMode::Clear),
            "pwtest" => typed(UnlockMode::Test),
            "lock" => SafeAction::Lock {
                first: form.value("lock1").to_string(),
                second: form.value("lock2").to_string(),
            },
            "random" => SafeAction::Random,
            "image_test" => uploaded(UnlockMode::Test),
            "image_unlock_1" => uploaded(UnlockMode::Unlock),
            "image_unlock_all" => uploaded(UnlockMode::Clear),
            _ => SafeAction::Unknown,
        }
    }
}

/// Result of running an action to completion
#[derive(Debug, Clone)]
pub enum ActionReply {
    Html(String),
    Download(PasswordImage),
}

/// One HTML reply line
///
/// Markup in `text` is escaped; embedded newlines become line breaks.
pub fn html_line(text: &str) -> String {
    format!("{}<br>\n", escape_html(text).replace('\n', "<br>\n"))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Run a streamed `open`, handing each rendered line to `emit`
///
/// Blocks until the lock reports completion, refuses, or the exchange is
/// cancelled or runs past its deadline. Failures are emitted as a final line.
pub fn run_open<S, F>(
    controller: &LockController<S>,
    duration: &str,
    open_grace: Duration,
    cancel: &CancelToken,
    mut emit: F,
) where
    S: ByteStream,
    F: FnMut(String),
{
    let outcome = OpenRequest::parse(duration).and_then(|request| {
        controller.open(request.with_grace(open_grace), cancel, |line| {
            emit(html_line(line))
        })
    });
    match outcome {
        Ok(OpenOutcome::Completed) => {}
        Ok(OpenOutcome::Refused(reply)) => debug!("Open refused: {reply}"),
        Err(e) => {
            warn!("Open ended early: {e}");
            emit(html_line(&e.to_string()));
        }
    }
}

/// Run `action` against the lock and render the reply
///
/// Blocks for the whole exchange. `open` is collected into a single page
/// here; the HTTP layer streams it through `run_open` instead.
pub fn run_action<S: ByteStream>(
    controller: &LockController<S>,
    action: SafeAction,
    open_grace: Duration,
) -> ActionReply {
    debug!("Running {action:?}");
    let html = match action {
        SafeAction::Status => match controller.status() {
            Ok(reply) => html_line(&reply),
            Err(e) => html_line(&e.to_string()),
        },
        SafeAction::Open { duration } => {
            let mut page = String::new();
            run_open(
                controller,
                &duration,
                open_grace,
                &CancelToken::new(),
                |chunk| page.push_str(&chunk),
            );
            page
        }
        SafeAction::Unlock { mode, password } => match controller.unlock(mode, &password) {
            Ok(reply) => html_line(&reply),
            Err(e) => html_line(&e.to_string()),
        },
        SafeAction::Lock { first, second } => match controller.lock(&first, &second) {
            Ok(report) => format!(
                "{}{}",
                html_line(&format!("Setting password: {}", report.set_reply)),
                html_line(&format!("Testing password: {}", report.test_reply)),
            ),
            Err(e) => html_line(&e.to_string()),
        },
        SafeAction::Random => match controller.random_lock() {
            Ok(image) => return ActionReply::Download(image),
            Err(e) => html_line(&e.to_string()),
        },
        SafeAction::ImageUnlock { image: None, .. } => html_line("No file selected"),
        SafeAction::ImageUnlock {
            mode,
            image: Some(bytes),
        } => match controller.unlock_with_image(mode, &bytes) {
            Ok(reply) => html_line(&reply),
            Err(e) => html_line(&e.to_string()),
        },
        SafeAction::Unknown => html_line("Unknown request"),
    };
    ActionReply::Html(html)
}
