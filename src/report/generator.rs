//! Allure report generation
//!
//! Wraps the external `allure` CLI. Trend history from the previous report
//! is copied into the results directory before each generation.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::Settings;

/// Sub-directory Allure keeps trend data in
pub const HISTORY_DIR: &str = "history";

#[cfg(windows)]
const DEFAULT_PROGRAM: &str = "allure.cmd";
#[cfg(not(windows))]
const DEFAULT_PROGRAM: &str = "allure";

/// How a report generation attempt ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportOutcome {
    Generated(PathBuf),
    ToolMissing,
    Failed(String),
}

impl ReportOutcome {
    pub fn is_generated(&self) -> bool {
        matches!(self, ReportOutcome::Generated(_))
    }
}

/// Drives the Allure CLI
#[derive(Clone, Debug)]
pub struct ReportGenerator {
    program: String,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl ReportGenerator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Generator for the configured `allure_command`, or the platform default
    pub fn from_settings(settings: &Settings) -> Self {
        match &settings.allure_command {
            Some(program) => Self::new(program.clone()),
            None => Self::default(),
        }
    }

    #[cfg(test)]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// True when `<program> --version` runs and exits zero
    pub async fn is_available(&self) -> bool {
        let output = Command::new(&self.program).arg("--version").output().await;

        match output {
            Ok(o) if o.status.success() => {
                debug!(
                    "{} version {}",
                    self.program,
                    String::from_utf8_lossy(&o.stdout).trim()
                );
                true
            }
            _ => false,
        }
    }

    /// Command line to run by hand
    pub fn manual_command(&self, results_dir: &Path, report_dir: &Path) -> String {
        format!(
            "{} generate {} -o {} --clean",
            self.program,
            results_dir.display(),
            report_dir.display()
        )
    }

    /// Generate the HTML report. Never fails the caller; problems are logged
    /// and reported through the outcome.
    pub async fn generate(&self, results_dir: &Path, report_dir: &Path) -> ReportOutcome {
        if !self.is_available().await {
            warn!("Allure CLI not found ({})", self.program);
            info!("Install it with: npm install -g allure-commandline");
            info!("Or run manually: {}", self.manual_command(results_dir, report_dir));
            return ReportOutcome::ToolMissing;
        }

        match preserve_history(results_dir, report_dir) {
            Ok(0) => debug!("No report history to carry over"),
            Ok(n) => info!("Carried over {} history file(s)", n),
            Err(e) => warn!("Could not carry over report history: {:#}", e),
        }

        info!("Generating Allure report...");
        let output = Command::new(&self.program)
            .arg("generate")
            .arg(results_dir)
            .arg("-o")
            .arg(report_dir)
            .arg("--clean")
            .output()
            .await;

        match output {
            Ok(o) if o.status.success() => {
                info!("Report generated: {}", report_dir.join("index.html").display());
                ReportOutcome::Generated(report_dir.to_path_buf())
            }
            Ok(o) => {
                let stderr = String::from_utf8_lossy(&o.stderr).trim().to_string();
                error!("Report generation failed: {}", stderr);
                ReportOutcome::Failed(stderr)
            }
            Err(e) => {
                error!("Report generation failed: {}", e);
                ReportOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Copy `<report_dir>/history` into `<results_dir>/history`, overwriting.
/// Returns the number of files copied.
pub fn preserve_history(results_dir: &Path, report_dir: &Path) -> Result<usize> {
    let source = report_dir.join(HISTORY_DIR);
    if !source.is_dir() {
        return Ok(0);
    }

    let target = results_dir.join(HISTORY_DIR);
    let mut copied = 0;

    for entry in WalkDir::new(&source) {
        let entry = entry.context("Failed to walk report history")?;
        let relative = entry
            .path()
            .strip_prefix(&source)
            .context("History entry outside history directory")?;
        let dest = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)
                .with_context(|| format!("Failed to create {}", dest.display()))?;
        } else {
            fs::copy(entry.path(), &dest)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
            copied += 1;
        }
    }

    Ok(copied)
}
