use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Log file used when `--log-file` is not given
pub fn default_log_path() -> PathBuf {
    std::env::temp_dir().join("k6ctl.log")
}

/// Send `tracing` output to `path`. The terminal belongs to the dashboard,
/// so nothing is ever written to stdout/stderr. Level comes from
/// `RUST_LOG`, default `info`.
pub fn init(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(io::Error::other)
}
