//! Environment variable configuration
//!
//! Provides environment variable overrides for settings and run options.

use std::env;

use super::Settings;

/// Environment variable prefix
const ENV_PREFIX: &str = "FEATURE_RUNNER";

/// Overrides read from the environment
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Settings file from FEATURE_RUNNER_CONFIG
    pub config_file: Option<String>,
    /// Features directory from FEATURE_RUNNER_FEATURES_DIR
    pub features_dir: Option<String>,
    /// Results directory from FEATURE_RUNNER_RESULTS_DIR
    pub results_dir: Option<String>,
    /// Report directory from FEATURE_RUNNER_REPORT_DIR
    pub report_dir: Option<String>,
    /// Worker count from FEATURE_RUNNER_WORKERS
    pub workers: Option<usize>,
    /// Execution mode from FEATURE_RUNNER_MODE
    pub mode: Option<String>,
    /// Debug logging from FEATURE_RUNNER_DEBUG
    pub debug: Option<bool>,
    /// Report generation from FEATURE_RUNNER_AUTO_REPORT
    pub auto_report: Option<bool>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            config_file: get_env("CONFIG"),
            features_dir: get_env("FEATURES_DIR"),
            results_dir: get_env("RESULTS_DIR"),
            report_dir: get_env("REPORT_DIR"),
            workers: get_env_parse("WORKERS"),
            mode: get_env("MODE"),
            debug: get_env_bool("DEBUG"),
            auto_report: get_env_bool("AUTO_REPORT"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.config_file.is_some()
            || self.features_dir.is_some()
            || self.results_dir.is_some()
            || self.report_dir.is_some()
            || self.workers.is_some()
            || self.mode.is_some()
            || self.debug.is_some()
            || self.auto_report.is_some()
    }

    /// Apply settings-level overrides
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.features_dir {
            settings.features_dir = dir.clone();
        }
        if let Some(dir) = &self.results_dir {
            settings.allure_results_dir = dir.clone();
        }
        if let Some(dir) = &self.report_dir {
            settings.allure_report_dir = dir.clone();
        }
        if let Some(debug) = self.debug {
            settings.browser_options.debug_mode = debug;
        }
        if let Some(auto_report) = self.auto_report {
            settings.auto_generate_report = auto_report;
        }
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_CONFIG:        {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_FEATURES_DIR:  {:?}", ENV_PREFIX, self.features_dir);
        println!("  {}_RESULTS_DIR:   {:?}", ENV_PREFIX, self.results_dir);
        println!("  {}_REPORT_DIR:    {:?}", ENV_PREFIX, self.report_dir);
        println!("  {}_WORKERS:       {:?}", ENV_PREFIX, self.workers);
        println!("  {}_MODE:          {:?}", ENV_PREFIX, self.mode);
        println!("  {}_DEBUG:         {:?}", ENV_PREFIX, self.debug);
        println!("  {}_AUTO_REPORT:   {:?}", ENV_PREFIX, self.auto_report);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}
