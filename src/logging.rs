//! Tracing subscriber setup for the `neu` binary.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level`. With `file` set, events are appended there
/// without ANSI colors; otherwise they go to stderr so stdout stays clean for
/// tables and JSON.
pub fn init(level: Option<&str>, file: Option<&Path>) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or(DEFAULT_LOG_LEVEL)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let installed = match file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::config(format!("Failed to create log directory '{}': {e}", parent.display()))
                })?;
            }
            let log = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| AppError::config(format!("Failed to open log file '{}': {e}", path.display())))?;
            builder.with_ansi(false).with_writer(Mutex::new(log)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    // A subscriber may already be installed (tests, embedding); keep it.
    if let Err(e) = installed {
        tracing::debug!("logging already initialised: {e}");
    }
    Ok(())
}
