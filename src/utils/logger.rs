//! Logging utilities
//!
//! Console output plus an optional plain-text run log under the log directory.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
        }
    }

    /// DEBUG when debug mode or verbose output is on, INFO otherwise
    pub fn for_run(debug: bool) -> Self {
        if debug {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

/// Timestamped log file path inside `log_dir`
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    log_dir.join(format!("{stamp}.log"))
}

/// Initialize the logger; `RUST_LOG` takes precedence over `level`.
///
/// When `log_dir` is given, a copy of every event is written to a fresh
/// timestamped file there, and its path is returned.
pub fn init_logger(level: LogLevel, log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("feature_runner={}", level.to_tracing_level())));

    let console = fmt::layer().with_target(false).compact();

    let (file_layer, log_path) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let path = log_file_path(dir);
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install logger")?;

    Ok(log_path)
}
