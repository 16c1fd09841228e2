//! Single unit execution
//!
//! Spawns the configured test process for one unit and captures what it
//! leaves behind. Never fails: every problem ends up in the returned
//! [`ExecutionResult`].

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::RunnerCommand;
use crate::models::{ExecutionResult, TestUnit};
use crate::utils::text::{preview, PREVIEW_CHARS};
use crate::utils::timer::Timer;

/// Environment variable extended with the project root
const PYTHONPATH: &str = "PYTHONPATH";

/// Runs one unit through the external test process
#[derive(Clone, Debug)]
pub struct UnitExecutor {
    command: RunnerCommand,
    project_root: PathBuf,
    timeout: Option<Duration>,
}

impl UnitExecutor {
    pub fn new(command: RunnerCommand, project_root: impl Into<PathBuf>) -> Self {
        Self {
            command,
            project_root: project_root.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `unit`, directing its raw results into `output_dir`
    pub async fn run(&self, unit: &TestUnit, output_dir: &Path) -> ExecutionResult {
        let timer = Timer::start(format!("unit {}", unit.index));
        let mut result = ExecutionResult::new(unit.index, unit.name.clone(), output_dir);

        let target = unit.target();
        let output_file = result.result_file();
        let args = self.command.render_args(&target, &output_file);

        info!("Running: {}", unit);
        debug!("Command: {}", self.command.display(&target, &output_file));

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&args)
            .current_dir(&self.project_root)
            .env(PYTHONPATH, python_path(&self.project_root))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(output) => output,
                Err(_) => {
                    result.timed_out = true;
                    result.duration_ms = timer.stop();
                    warn!("{} - timed out after {}s", unit.name, limit.as_secs_f64());
                    return result;
                }
            },
            None => cmd.output().await,
        };

        result.duration_ms = timer.stop();

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!("{} - failed to start {}: {}", unit.name, self.command.program, e);
                return result.with_error(format!("failed to start {}: {e}", self.command.program));
            }
        };

        result.exit_code = output.status.code();
        result.stdout = String::from_utf8_lossy(&output.stdout).to_string();
        result.stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            debug!("{} finished in {}ms", unit.name, result.duration_ms);
        } else {
            match result.exit_code {
                Some(code) => warn!("{} - exit code: {}", unit.name, code),
                None => warn!("{} - terminated by signal", unit.name),
            }
            if !result.stderr.trim().is_empty() {
                warn!("Error: {}", preview(&result.stderr, PREVIEW_CHARS));
            }
            if !result.stdout.trim().is_empty() {
                warn!("Output: {}", preview(&result.stdout, PREVIEW_CHARS));
            }
        }

        result
    }
}

/// Project root prepended to any inherited `PYTHONPATH`
fn python_path(root: &Path) -> OsString {
    let mut paths = vec![root.to_path_buf()];
    if let Some(existing) = env::var_os(PYTHONPATH) {
        paths.extend(env::split_paths(&existing).filter(|p| !p.as_os_str().is_empty()));
    }
    env::join_paths(paths).unwrap_or_else(|_| root.as_os_str().to_os_string())
}
