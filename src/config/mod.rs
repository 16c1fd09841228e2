//! Configuration module
//!
//! Handles loading and managing run settings. Settings are loaded once in
//! `main` and handed by reference to every component that needs them.

mod env;
mod file;

pub use env::EnvConfig;
pub use file::{expand_path, locate};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Placeholder replaced by the feature path in runner arguments
pub const FEATURE_PLACEHOLDER: &str = "{feature}";

/// Placeholder replaced by the raw result file path in runner arguments
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Run settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base directory holding `.feature` files
    pub features_dir: String,

    /// Merged, normalized results directory
    pub allure_results_dir: String,

    /// Generated HTML report directory
    pub allure_report_dir: String,

    /// Per-run raw results tree
    pub temp_results_dir: String,

    /// Run the report generator after a successful conversion
    pub auto_generate_report: bool,

    /// External test process invoked once per unit
    pub runner_command: RunnerCommand,

    /// Allure CLI program (platform default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allure_command: Option<String>,

    /// Kill a unit's process after this many seconds (no limit when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_timeout_secs: Option<u64>,

    /// Directory for run log files
    pub log_dir: String,

    /// Browser options shared with the step implementations
    pub browser_options: BrowserOptions,

    /// Keys owned by other tools reading the same file
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            features_dir: "features".to_string(),
            allure_results_dir: "allure_results".to_string(),
            allure_report_dir: "allure_report".to_string(),
            temp_results_dir: "temp_results".to_string(),
            auto_generate_report: true,
            runner_command: RunnerCommand::default(),
            allure_command: None,
            unit_timeout_secs: None,
            log_dir: "log_report".to_string(),
            browser_options: BrowserOptions::default(),
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load settings for a project, honoring an explicit path or env override.
    /// Returns the defaults when no file is found.
    pub fn load_for(root: &Path, explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let env = EnvConfig::load();

        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => env
                .config_file
                .as_deref()
                .map(expand_path)
                .or_else(|| locate(root)),
        };

        let mut settings = match &path {
            Some(path) => Self::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => Self::default(),
        };

        env.apply(&mut settings);
        settings.validate()?;
        Ok((settings, path))
    }

    pub fn features_path(&self, root: &Path) -> PathBuf {
        root.join(&self.features_dir)
    }

    pub fn results_path(&self, root: &Path) -> PathBuf {
        root.join(&self.allure_results_dir)
    }

    pub fn report_path(&self, root: &Path) -> PathBuf {
        root.join(&self.allure_report_dir)
    }

    pub fn temp_path(&self, root: &Path) -> PathBuf {
        root.join(&self.temp_results_dir)
    }

    pub fn log_path(&self, root: &Path) -> PathBuf {
        root.join(&self.log_dir)
    }

    pub fn debug_mode(&self) -> bool {
        self.browser_options.debug_mode
    }
}

/// Program and argument template for the per-unit test process
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerCommand {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for RunnerCommand {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: [
                "-m",
                "behave",
                FEATURE_PLACEHOLDER,
                "-f",
                "json",
                "-o",
                OUTPUT_PLACEHOLDER,
                "--no-capture",
                "--no-skipped",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl RunnerCommand {
    #[cfg(test)]
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Arguments with placeholders substituted
    pub fn render_args(&self, feature: &Path, output: &Path) -> Vec<String> {
        let feature = feature.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(FEATURE_PLACEHOLDER, &feature)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }

    /// Printable command line
    pub fn display(&self, feature: &Path, output: &Path) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.render_args(feature, output));
        parts.join(" ")
    }
}

/// Browser section of the settings file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    #[serde(deserialize_with = "truthy")]
    pub debug_mode: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Accept `true`, `"yes"`, `1` and friends
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::String(s) => {
            matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
        }
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        serde_json::Value::Null => false,
        _ => true,
    })
}
