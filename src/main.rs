//! feature-runner - parallel behave runner with Allure reporting
//!
//! Discovers Gherkin feature files, runs each one (or each scenario) as an
//! isolated `behave` process, converts the raw JSON output into Allure
//! results and generates the HTML report.
//!
//! ## Usage
//!
//! ```bash
//! # Run every feature, one at a time
//! feature-runner
//!
//! # Run in parallel with 4 workers
//! feature-runner --mode parallel --workers 4
//!
//! # Run one file, one unit per scenario
//! feature-runner --feature login.feature --granularity scenario
//!
//! # Show what would run
//! feature-runner list --detailed
//!
//! # Convert an existing raw results tree and build the report
//! feature-runner convert temp_results --report
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

mod cli;
mod config;
mod converter;
mod discovery;
mod executor;
mod models;
mod output;
mod report;
mod utils;

use cli::Args;
use config::{EnvConfig, Settings};
use converter::ResultConverter;
use discovery::FeatureDiscovery;
use executor::{default_workers, ExecutionMode, RunOptions, RunPipeline, EXIT_FAILURE, EXIT_OK};
use models::Granularity;
use output::{write_summary_to_file, OutputFormat, ResultFormatter};
use report::{result_files, ReportGenerator, ReportOutcome, ResultWriter};
use utils::logger::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(args: Args) -> Result<u8> {
    let root = project_root(args.root.as_deref())?;
    let explicit = args.config.as_deref().map(config::expand_path);

    if let Some(cli::Command::Config(config_args)) = args.command {
        init_logger(LogLevel::for_run(args.verbose), None)?;
        return manage_config(config_args, &root, explicit.as_deref());
    }

    let (settings, source) = Settings::load_for(&root, explicit.as_deref())?;

    let is_run = matches!(args.command, None | Some(cli::Command::Run(_)));
    let log_dir = is_run.then(|| settings.log_path(&root));
    let level = LogLevel::for_run(args.verbose || settings.debug_mode());
    let log_file = init_logger(level, log_dir.as_deref())?;

    match &source {
        Some(path) => info!("Settings: {}", path.display()),
        None => info!("No settings file found, using defaults"),
    }
    if let Some(path) = log_file {
        info!("Log file: {}", path.display());
    }

    match args.command {
        None => run_features(args.run, &settings, &root).await,
        Some(cli::Command::Run(run_args)) => run_features(run_args, &settings, &root).await,
        Some(cli::Command::List(list_args)) => list_units(list_args, &settings, &root),
        Some(cli::Command::Convert(convert_args)) => {
            convert_results(convert_args, &settings, &root).await
        }
        Some(cli::Command::Report(report_args)) => {
            generate_report(report_args, &settings, &root).await
        }
        Some(cli::Command::Config(config_args)) => {
            manage_config(config_args, &root, explicit.as_deref())
        }
    }
}

/// `--root`, made absolute against the working directory
fn project_root(root: Option<&str>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    Ok(match root {
        Some(root) => rooted(&cwd, root),
        None => cwd,
    })
}

/// A user-supplied path, relative paths taken from `root`
fn rooted(root: &Path, path: &str) -> PathBuf {
    root.join(config::expand_path(path))
}

fn parse_granularity(value: &str) -> Result<Granularity> {
    Granularity::from_str(value)
        .ok_or_else(|| anyhow::anyhow!("Unknown granularity: {value} (expected feature or scenario)"))
}

async fn run_features(args: cli::RunArgs, settings: &Settings, root: &Path) -> Result<u8> {
    let env = EnvConfig::load();

    let mode_name = args
        .mode
        .or(env.mode)
        .unwrap_or_else(|| "single".to_string());
    let mode = ExecutionMode::from_str(&mode_name).ok_or_else(|| {
        anyhow::anyhow!("Unknown mode: {mode_name} (expected single, sequential or parallel)")
    })?;
    let format = OutputFormat::from_str(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown format: {}", args.format))?;

    let options = RunOptions {
        mode,
        workers: args.workers.or(env.workers).unwrap_or_else(default_workers),
        feature: args.feature,
        granularity: parse_granularity(&args.granularity)?,
        generate_report: !args.no_report,
        keep_temp: args.keep_temp,
    };

    info!(
        "🚀 Test run started at {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let outcome = RunPipeline::new(settings, root).run(&options).await?;
    if outcome.executions.is_empty() {
        return Ok(outcome.exit_code);
    }

    let formatter = ResultFormatter::new(format);
    let problems: Vec<_> = outcome
        .executions
        .iter()
        .filter(|e| !e.success())
        .cloned()
        .collect();
    if !problems.is_empty() && format == OutputFormat::Table {
        println!("\nUnits that did not finish cleanly:");
        print!("{}", formatter.format_executions(&problems));
    }
    println!("{}", formatter.format_summary(&outcome.summary));

    if format == OutputFormat::Table {
        if outcome.summary.is_all_passed() {
            println!("✓ All scenarios passed");
        }
        match &outcome.report {
            Some(ReportOutcome::Generated(dir)) => {
                println!("📊 Report: {}", dir.join("index.html").display())
            }
            Some(ReportOutcome::ToolMissing) => println!("✗ Report not generated: Allure CLI not found"),
            Some(ReportOutcome::Failed(reason)) => println!("✗ Report generation failed: {reason}"),
            None => {}
        }
        println!("⏱  {}", outcome.timings);
    }

    if let Some(path) = args.summary_file {
        write_summary_to_file(Path::new(&path), &outcome.summary, format)?;
        info!("Summary written to {}", path);
    }

    Ok(outcome.exit_code)
}

fn list_units(args: cli::ListArgs, settings: &Settings, root: &Path) -> Result<u8> {
    let discovery = FeatureDiscovery::new(settings.features_path(root))
        .with_granularity(parse_granularity(&args.granularity)?);

    match discovery.discover(args.feature.as_deref()) {
        Ok(units) => {
            println!("{}", ResultFormatter::default().format_units(&units, args.detailed));
            Ok(EXIT_OK)
        }
        Err(e) => {
            error!("{}", e);
            Ok(EXIT_FAILURE)
        }
    }
}

async fn convert_results(args: cli::ConvertArgs, settings: &Settings, root: &Path) -> Result<u8> {
    let input = rooted(root, &args.input);
    if !input.is_dir() {
        anyhow::bail!("Raw results directory not found: {}", input.display());
    }

    let results_dir = args
        .output
        .map(|output| rooted(root, &output))
        .unwrap_or_else(|| settings.results_path(root));
    let writer = ResultWriter::create(&results_dir)
        .with_context(|| format!("Failed to create {}", results_dir.display()))?;

    let conversion = ResultConverter::new().convert_dir(&input, &writer);
    println!(
        "✓ Converted {} scenario(s) from {} file(s) into {}",
        conversion.written(),
        conversion.files,
        writer.dir().display()
    );
    for skipped in &conversion.skipped {
        println!("  ✗ skipped {}", skipped.display());
    }

    if conversion.written() == 0 {
        error!("No scenarios converted");
        return Ok(EXIT_FAILURE);
    }

    if args.report {
        let generator = ReportGenerator::from_settings(settings);
        generator
            .generate(writer.dir(), &settings.report_path(root))
            .await;
    }

    Ok(EXIT_OK)
}

async fn generate_report(args: cli::ReportArgs, settings: &Settings, root: &Path) -> Result<u8> {
    let results_dir = args
        .results
        .map(|dir| rooted(root, &dir))
        .unwrap_or_else(|| settings.results_path(root));
    let report_dir = args
        .output
        .map(|dir| rooted(root, &dir))
        .unwrap_or_else(|| settings.report_path(root));

    let files = result_files(&results_dir)
        .with_context(|| format!("Failed to read results directory: {}", results_dir.display()))?;
    if files.is_empty() {
        warn!("No result files in {}", results_dir.display());
        return Ok(EXIT_FAILURE);
    }
    info!("Found {} result file(s)", files.len());

    let outcome = ReportGenerator::from_settings(settings)
        .generate(&results_dir, &report_dir)
        .await;

    Ok(if outcome.is_generated() {
        EXIT_OK
    } else {
        EXIT_FAILURE
    })
}

fn manage_config(args: cli::ConfigArgs, root: &Path, explicit: Option<&Path>) -> Result<u8> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = root.join(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Settings file already exists: {}. Use --force to overwrite.",
                    path.display()
                );
            }

            Settings::default().save(&path)?;
            println!("✓ Settings file created: {}", path.display());
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { format, env } => {
            if env {
                let env_config = EnvConfig::load();
                if !env_config.has_any() {
                    println!("No FEATURE_RUNNER_* variables set.");
                }
                env_config.print_summary();
            } else {
                let (settings, source) = Settings::load_for(root, explicit)?;
                if let Some(path) = source {
                    println!("# {}", path.display());
                }
                let output = if format == "yaml" {
                    serde_yaml::to_string(&settings)?
                } else {
                    serde_json::to_string_pretty(&settings)?
                };
                println!("{output}");
            }
        }

        cli::ConfigAction::Validate { file } => {
            let path = file
                .as_deref()
                .map(config::expand_path)
                .or_else(|| explicit.map(Path::to_path_buf))
                .or_else(|| config::locate(root))
                .ok_or_else(|| anyhow::anyhow!("No settings file found under {}", root.display()))?;

            match Settings::load(&path).and_then(|s| s.validate()) {
                Ok(()) => {
                    println!("✓ Settings file is valid: {}", path.display());
                }
                Err(e) => {
                    println!("✗ Settings file is invalid: {}", path.display());
                    println!("  Error: {e:#}");
                    return Err(e);
                }
            }
        }
    }

    Ok(EXIT_OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    #[cfg(unix)]
    fn test_rooted_paths() {
        let root = Path::new("/project");
        assert_eq!(rooted(root, "temp_results"), PathBuf::from("/project/temp_results"));
        assert_eq!(rooted(root, "/abs/raw"), PathBuf::from("/abs/raw"));
    }

    #[tokio::test]
    async fn test_convert_input_resolves_against_root() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("kept/result_1");
        std::fs::create_dir_all(&raw).unwrap();
        std::fs::write(
            raw.join("results.json"),
            r#"[{"name": "F", "elements": [{"name": "S", "steps": []}]}]"#,
        )
        .unwrap();

        let args = cli::ConvertArgs {
            input: "kept".to_string(),
            output: Some("converted".to_string()),
            report: false,
        };
        let code = convert_results(args, &Settings::default(), dir.path())
            .await
            .unwrap();

        assert_eq!(code, EXIT_OK);
        assert_eq!(result_files(&dir.path().join("converted")).unwrap().len(), 1);
    }
}
