//! Logger setup
//!
//! Level defaults to `info`, or `debug` when the `DEBUG` environment variable
//! holds a true value. `RUST_LOG` overrides both.

use env_logger::Env;

/// Environment variable that switches the default level to `debug`
pub const DEBUG_VAR: &str = "DEBUG";

/// Install the global logger
pub fn init() {
    let debug = std::env::var(DEBUG_VAR)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(false);
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter(debug))).init();
}

fn default_filter(debug: bool) -> &'static str {
    if debug { "debug" } else { "info" }
}

/// Parse the usual spellings of a boolean flag
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
