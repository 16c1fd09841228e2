//! Settings file management
//!
//! Handles finding, loading, saving, and validating settings files.

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

use super::Settings;

/// Default settings file, relative to the project root
pub const DEFAULT_CONFIG_PATH: &str = "config/test_setting.json";

/// Settings file locations relative to the project root (in order of precedence)
const PROJECT_LOCATIONS: &[&str] = &[
    DEFAULT_CONFIG_PATH,
    "config/test_setting.yaml",
    "config/test_setting.yml",
    "feature-runner.json",
    "feature-runner.yaml",
];

/// User-level fallbacks
const USER_LOCATIONS: &[&str] = &[
    "~/.config/feature-runner/config.json",
    "~/.feature-runner.json",
];

/// Find a settings file for the given project root
pub fn locate(root: &Path) -> Option<PathBuf> {
    PROJECT_LOCATIONS
        .iter()
        .map(|location| root.join(location))
        .chain(USER_LOCATIONS.iter().map(|location| expand_path(location)))
        .find(|path| path.is_file())
}

impl Settings {
    /// Load settings from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML settings: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON settings: {}", path.display()))?
        };

        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize settings")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize settings")?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))?;

        Ok(())
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.runner_command.program.trim().is_empty() {
            anyhow::bail!("runner_command.program must not be empty");
        }

        for (key, value) in [
            ("features_dir", &self.features_dir),
            ("allure_results_dir", &self.allure_results_dir),
            ("temp_results_dir", &self.temp_results_dir),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{key} must not be empty");
            }
        }

        // Both trees are removed at the start of a run
        let wiped = [
            ("allure_results_dir", &self.allure_results_dir),
            ("temp_results_dir", &self.temp_results_dir),
        ];
        let kept = [
            ("features_dir", &self.features_dir),
            ("allure_report_dir", &self.allure_report_dir),
            ("log_dir", &self.log_dir),
        ];

        for (key, value) in wiped {
            let dir = normalized(value);
            if !dir.components().any(|c| matches!(c, Component::Normal(_))) {
                anyhow::bail!("{key} must name a directory below the project root (got '{value}')");
            }
            for (other_key, other) in kept.iter().chain(wiped.iter()) {
                if *other_key != key && normalized(other).starts_with(&dir) {
                    anyhow::bail!(
                        "{key} ('{value}') would remove {other_key} ('{other}') when cleared"
                    );
                }
            }
        }

        if self.unit_timeout_secs == Some(0) {
            anyhow::bail!("unit_timeout_secs must be greater than zero when set");
        }

        Ok(())
    }
}

/// Lexical form used to compare configured directories; `./a/` and `a` match
fn normalized(dir: &str) -> PathBuf {
    Path::new(dir.trim())
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Expand ~ to home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
