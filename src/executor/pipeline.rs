//! End-to-end run
//!
//! discover → clean → execute → convert → report → summarize.
//! Only a discovery failure or a fatal filesystem error stops the run early;
//! unit, conversion and report problems are logged and carried in the outcome.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use super::scheduler::{default_workers, ExecutionMode, Scheduler};
use super::unit::UnitExecutor;
use super::workspace::{remove_tree, RunWorkspace};
use crate::config::Settings;
use crate::converter::ResultConverter;
use crate::discovery::FeatureDiscovery;
use crate::models::{ExecutionResult, Granularity, RunSummary};
use crate::report::{ReportGenerator, ReportOutcome, ResultWriter};
use crate::utils::timer::PhaseClock;

/// Exit code of a run that converted at least one scenario
pub const EXIT_OK: u8 = 0;
/// Exit code of a run that found nothing to run or converted nothing
pub const EXIT_FAILURE: u8 = 1;

/// Per-invocation run options
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub mode: ExecutionMode,
    pub workers: usize,
    pub feature: Option<String>,
    pub granularity: Granularity,
    /// Generate the HTML report after conversion
    pub generate_report: bool,
    /// Keep the raw results tree after the run
    pub keep_temp: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            workers: default_workers(),
            feature: None,
            granularity: Granularity::Feature,
            generate_report: true,
            keep_temp: false,
        }
    }
}

/// What a run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub executions: Vec<ExecutionResult>,
    pub summary: RunSummary,
    pub report: Option<ReportOutcome>,
    pub exit_code: u8,
    /// Phase timings, e.g. `discovery 2ms | execution 3041ms | ...`
    pub timings: String,
}

impl RunOutcome {
    fn nothing_to_run() -> Self {
        Self {
            executions: Vec::new(),
            summary: RunSummary::new(&[], &[], 0),
            report: None,
            exit_code: EXIT_FAILURE,
            timings: String::new(),
        }
    }
}

/// One run over a project, driven by loaded settings
pub struct RunPipeline<'a> {
    settings: &'a Settings,
    root: PathBuf,
}

impl<'a> RunPipeline<'a> {
    pub fn new(settings: &'a Settings, root: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            root: root.into(),
        }
    }

    pub fn executor(&self) -> UnitExecutor {
        UnitExecutor::new(self.settings.runner_command.clone(), &self.root)
            .with_timeout(self.settings.unit_timeout_secs.map(Duration::from_secs))
    }

    pub async fn run(&self, options: &RunOptions) -> Result<RunOutcome> {
        let mut clock = PhaseClock::new();

        let discovery = FeatureDiscovery::new(self.settings.features_path(&self.root))
            .with_granularity(options.granularity);
        let units = match discovery.discover(options.feature.as_deref()) {
            Ok(units) => units,
            Err(e) => {
                error!("{}", e);
                return Ok(RunOutcome::nothing_to_run());
            }
        };
        clock.phase("discovery");

        let scheduler = Scheduler::new(self.executor(), options.mode).with_workers(options.workers);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("Units: {}", units.len());
        info!("Mode: {}", scheduler.mode().name());
        if scheduler.mode() == ExecutionMode::Parallel {
            info!("Workers: {}", scheduler.workers());
        }
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let results_dir = self.settings.results_path(&self.root);
        remove_tree(&results_dir)
            .with_context(|| format!("Failed to clean {}", results_dir.display()))?;
        let mut workspace = RunWorkspace::create(self.settings.temp_path(&self.root))?
            .with_keep(options.keep_temp);
        clock.phase("cleanup");

        let executions = scheduler.run(units, &workspace).await;
        let failed_units = executions.iter().filter(|e| !e.success()).count();
        if failed_units > 0 {
            warn!("{} of {} unit(s) did not finish cleanly", failed_units, executions.len());
        }
        clock.phase("execution");

        let writer = ResultWriter::create(&results_dir)
            .with_context(|| format!("Failed to create {}", results_dir.display()))?;
        let conversion = ResultConverter::new().convert_dir(workspace.root(), &writer);
        clock.phase("conversion");

        let converted = conversion.written();
        let report_dir = self.settings.report_path(&self.root);
        let generator = ReportGenerator::from_settings(self.settings);

        let report = if converted == 0 {
            error!("No scenarios converted");
            None
        } else {
            info!("Converted {} scenario(s) into {}", converted, results_dir.display());
            if options.generate_report && self.settings.auto_generate_report {
                let outcome = generator.generate(&results_dir, &report_dir).await;
                clock.phase("report");
                Some(outcome)
            } else {
                info!(
                    "Report generation skipped. Run: {}",
                    generator.manual_command(&results_dir, &report_dir)
                );
                None
            }
        };

        workspace.cleanup();

        let summary = RunSummary::new(&executions, &conversion.scenarios, clock.total_ms());
        let timings = clock.format();
        info!("Timings: {}", timings);

        Ok(RunOutcome {
            executions,
            summary,
            report,
            exit_code: if converted > 0 { EXIT_OK } else { EXIT_FAILURE },
            timings,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::RunnerCommand;
    use crate::models::Status;
    use crate::report::result_files;
    use std::fs;
    use tempfile::tempdir;

    /// Writes one passing scenario named after the feature, unless the
    /// feature name contains "bad"
    const FAKE_BEHAVE: &str = r#"case "$1" in */bad*) echo broken >&2; exit 1;; esac; printf '[{"name":"%s","elements":[{"type":"scenario","name":"S","status":"passed","steps":[{"keyword":"Given ","name":"x","result":{"status":"passed","duration":0.01}}]}]}]' "$(basename "$1" .feature)" > "$2""#;

    fn project(features: &[&str]) -> (tempfile::TempDir, Settings) {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("features")).unwrap();
        for name in features {
            fs::write(
                dir.path().join("features").join(name),
                "Feature: F\n  Scenario: S\n    Given x\n",
            )
            .unwrap();
        }

        let mut settings = Settings::default();
        settings.runner_command =
            RunnerCommand::new("sh", &["-c", FAKE_BEHAVE, "sh", "{feature}", "{output}"]);
        settings.allure_command = Some("no-such-allure-binary-5d2e".to_string());
        (dir, settings)
    }

    fn options(mode: ExecutionMode) -> RunOptions {
        RunOptions {
            mode,
            workers: 2,
            generate_report: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sequential_run_with_one_failing_unit() {
        let (dir, settings) = project(&["a.feature", "bad.feature", "c.feature"]);
        let pipeline = RunPipeline::new(&settings, dir.path());

        let outcome = pipeline.run(&options(ExecutionMode::Sequential)).await.unwrap();

        assert_eq!(outcome.exit_code, EXIT_OK);
        assert_eq!(outcome.executions.len(), 3);
        assert_eq!(outcome.summary.units_failed, 1);
        assert_eq!(outcome.summary.total, 2);
        assert_eq!(outcome.summary.passed, 2);
        assert_eq!(outcome.summary.scenarios[0].feature, "a");
        assert!(outcome.report.is_none());

        let written = result_files(&settings.results_path(dir.path())).unwrap();
        assert_eq!(written.len(), 2);
        assert!(!settings.temp_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn test_parallel_run_matches_sequential() {
        let (dir, settings) = project(&["a.feature", "b.feature", "c.feature", "d.feature"]);
        let pipeline = RunPipeline::new(&settings, dir.path());

        let outcome = pipeline.run(&options(ExecutionMode::Parallel)).await.unwrap();

        assert_eq!(outcome.exit_code, EXIT_OK);
        assert_eq!(
            outcome.executions.iter().map(|e| e.index).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert_eq!(outcome.summary.total, 4);
        assert!(outcome
            .summary
            .scenarios
            .iter()
            .all(|s| s.status == Status::Passed));
    }

    #[tokio::test]
    async fn test_previous_results_are_replaced() {
        let (dir, settings) = project(&["a.feature"]);
        let stale = settings.results_path(dir.path()).join("stale-result.json");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "{}").unwrap();

        let pipeline = RunPipeline::new(&settings, dir.path());
        pipeline.run(&options(ExecutionMode::Sequential)).await.unwrap();

        assert!(!stale.exists());
        assert_eq!(result_files(&settings.results_path(dir.path())).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_keep_temp() {
        let (dir, settings) = project(&["a.feature"]);
        let pipeline = RunPipeline::new(&settings, dir.path());
        let opts = RunOptions {
            keep_temp: true,
            ..options(ExecutionMode::Sequential)
        };

        pipeline.run(&opts).await.unwrap();
        assert!(settings
            .temp_path(dir.path())
            .join("result_1/results.json")
            .exists());
    }

    #[tokio::test]
    async fn test_nothing_converted_fails() {
        let (dir, settings) = project(&["bad_one.feature", "bad_two.feature"]);
        let pipeline = RunPipeline::new(&settings, dir.path());

        let outcome = pipeline.run(&options(ExecutionMode::Sequential)).await.unwrap();
        assert_eq!(outcome.exit_code, EXIT_FAILURE);
        assert_eq!(outcome.executions.len(), 2);
        assert_eq!(outcome.summary.total, 0);
    }

    /// Acts like behave on `<file>:<line>`: the selected scenario runs and
    /// every other scenario of the file is listed as skipped with no results
    const FAKE_BEHAVE_LINE: &str = r#"printf '[{"name":"Login","elements":[{"type":"scenario","name":"line %s","status":"passed","steps":[{"keyword":"Given ","name":"x","result":{"status":"passed","duration":0.01}}]},{"type":"scenario","name":"Sibling","status":"skipped","steps":[{"keyword":"Given ","name":"y"}]}]}]' "${1##*:}" > "$2""#;

    #[tokio::test]
    async fn test_scenario_granularity() {
        let (dir, mut settings) = project(&[]);
        settings.runner_command =
            RunnerCommand::new("sh", &["-c", FAKE_BEHAVE_LINE, "sh", "{feature}", "{output}"]);
        fs::write(
            dir.path().join("features/login.feature"),
            "Feature: Login\n\n  Scenario: One\n    Given x\n\n  Scenario: Two\n    Given y\n",
        )
        .unwrap();

        let pipeline = RunPipeline::new(&settings, dir.path());
        let opts = RunOptions {
            granularity: Granularity::Scenario,
            ..options(ExecutionMode::Parallel)
        };

        let outcome = pipeline.run(&opts).await.unwrap();
        assert_eq!(outcome.exit_code, EXIT_OK);
        assert_eq!(outcome.executions.len(), 2);
        assert_eq!(outcome.executions[0].unit_name, "One");

        assert_eq!(outcome.summary.total, outcome.executions.len());
        let names: Vec<_> = outcome
            .summary
            .scenarios
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["line 3", "line 6"]);
        assert_eq!(result_files(&settings.results_path(dir.path())).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_discovery_failure() {
        let (dir, settings) = project(&[]);
        let pipeline = RunPipeline::new(&settings, dir.path());

        let outcome = pipeline.run(&options(ExecutionMode::Sequential)).await.unwrap();
        assert_eq!(outcome.exit_code, EXIT_FAILURE);
        assert!(outcome.executions.is_empty());
    }

    #[tokio::test]
    async fn test_missing_report_tool_keeps_exit_code() {
        let (dir, settings) = project(&["a.feature"]);
        let pipeline = RunPipeline::new(&settings, dir.path());
        let opts = RunOptions {
            generate_report: true,
            ..options(ExecutionMode::Sequential)
        };

        let outcome = pipeline.run(&opts).await.unwrap();
        assert_eq!(outcome.exit_code, EXIT_OK);
        assert_eq!(outcome.report, Some(ReportOutcome::ToolMissing));
    }
}
