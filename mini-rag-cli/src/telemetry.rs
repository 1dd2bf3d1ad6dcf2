use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Install the global tracing subscriber.
///
/// Console output goes to stderr so stdout stays machine readable. The
/// filter comes from `RUST_LOG`, falling back to `log_level`. With
/// `log_file` set, a second plain-text layer appends to that file.
///
/// # Errors
///
/// Fails if `log_level` is not a valid filter, the log file cannot be
/// opened, or a subscriber is already installed.
pub fn init(log_level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level.to_ascii_lowercase())
            .with_context(|| format!("invalid log level '{log_level}'"))?,
    };

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_writer(Arc::new(file)).with_ansi(false).with_target(true))
        }
        None => None,
    };

    Registry::default()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")
}
