use std::path::PathBuf;

use clap::Args;

use crate::config::Overrides;

#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    /// Configuration file (default `~/.safe.cfg`)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Serial port the lock is attached to
    #[arg(long)]
    pub serial_port: Option<String>,

    /// HTTP port to listen on
    #[arg(long)]
    pub listen_port: Option<u16>,

    /// Directory of static files and `lock_image.jpg`
    #[arg(long)]
    pub html_dir: Option<PathBuf>,
}

impl ServeArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            serial_port: self.serial_port.clone(),
            listen_port: self.listen_port,
            html_dir: self.html_dir.clone(),
        }
    }
}
