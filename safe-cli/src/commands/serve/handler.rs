//! Serve command handler
//!
//! Orchestrates startup: configuration, lock image, serial link and the
//! HTTP server.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use safe_link::{ByteStream, DeviceLink, SerialStream};
use safe_model::ImageRecord;
use safe_server::LockController;
use tokio::net::TcpListener;

use super::args::ServeArgs;
use super::auth::Credentials;
use super::routes::{AppState, SharedController, router};
use crate::config::{SafeConfig, default_config_path};
use crate::messages;

/// Start the lock server
///
/// Loads the configuration and the lock image, connects to the lock and
/// serves HTTP until interrupted. Any failure before the listener is bound
/// is returned as an error.
pub fn handle_serve(args: ServeArgs) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    info!("Reading configuration from {}", config_path.display());
    let config = SafeConfig::load(&config_path)?.with_overrides(&args.overrides());
    info!("  Serial port = {}", config.serial_port);
    info!("  Listen port = {}", config.listen_port);
    info!("  HTML dir    = {}", config.html_dir.display());
    if config.auth_enabled() {
        info!("  Basic auth user = {}", config.auth_user);
    }

    let lock_image = load_lock_image(&config.lock_image_path())?;
    info!("  Lock image loaded");

    let stream = SerialStream::open(&config.serial_settings())
        .with_context(|| format!("Could not open serial port {}", config.serial_port))?;
    let link = DeviceLink::new(Box::new(stream) as Box<dyn ByteStream>, config.link_config());
    let controller: SharedController = Arc::new(LockController::new(link, lock_image));

    let attempt = controller.sync().context("Failed to connect to safe")?;
    info!("  Successfully connected to safe after {attempt} ping(s)");
    match controller.status() {
        Ok(status) => info!("  {status}"),
        Err(e) => warn!("  Status unavailable: {e}"),
    }

    let state = AppState {
        controller: Arc::clone(&controller),
        auth: config
            .auth_enabled()
            .then(|| Credentials::new(config.auth_user.clone(), config.auth_pass.clone())),
        html_dir: config.html_dir.clone(),
        open_grace: config.open_grace(),
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        let listener = TcpListener::bind(("0.0.0.0", config.listen_port))
            .await
            .with_context(|| format!("Failed to listen on port {}", config.listen_port))?;
        messages::print_success(
            "Safe server running",
            &[&format!("http://localhost:{}/", config.listen_port)],
        );
        serve(listener, state).await
    })?;

    if let Err(e) = controller.close() {
        warn!("Failed to close serial port: {e}");
    }
    Ok(())
}

/// Decode the template that password images are made from
pub fn load_lock_image(path: &Path) -> Result<ImageRecord> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    safe_model::decode(&bytes).with_context(|| format!("Failed to decode {}", path.display()))
}

/// Serve the routes on `listener` until Ctrl-C
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let server = axum::serve(listener, router(state));

    tokio::select! {
        result = server => {
            if let Err(err) = result {
                error!("Server error: {err}");
                return Err(err.into());
            }
        }
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Shutting down"),
                Err(err) => error!("Failed to listen for shutdown signal: {err}"),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_lock_image_missing_file() {
        let dir = TempDir::new().unwrap();

        let err = load_lock_image(&dir.path().join("lock_image.jpg")).unwrap_err();

        assert!(err.to_string().starts_with("Failed to read"));
    }

    #[test]
    fn test_load_lock_image_not_a_jpeg() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lock_image.jpg");
        std::fs::write(&path, b"GIF89a").unwrap();

        let err = load_lock_image(&path).unwrap_err();

        assert!(err.to_string().starts_with("Failed to decode"));
    }
}
