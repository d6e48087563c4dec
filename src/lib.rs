// procwatch library - public API

use std::fs::OpenOptions;
use std::path::Path;

use log::LevelFilter;

// Re-export error types
pub mod error;
pub use error::{ErrorKind, ProcwatchError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod platform;
pub mod ui;

// Re-export commonly used types
pub use crate::core::config::Config;

/// Initialize logging.
///
/// `RUST_LOG` refines `default_level` unless logging is switched off, which
/// is how the dashboard keeps the alternate screen clean. With `log_file`
/// set, records are appended there instead of stderr.
pub fn init_logging(default_level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(default_level);

    if default_level != LevelFilter::Off {
        builder.parse_default_env();
    }

    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder
        .try_init()
        .map_err(|e| ProcwatchError::other(format!("Failed to initialize logging: {}", e)))
}
