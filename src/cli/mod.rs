//! CLI argument parsing
//!
//! Defines command-line interface using clap. Running without a subcommand
//! executes the feature suite.

use clap::{Parser, Subcommand};

/// Parallel behave runner with Allure reporting
#[derive(Parser, Debug)]
#[command(name = "feature-runner")]
#[command(version = "0.1.0")]
#[command(about = "Run behave features sequentially or in parallel and build an Allure report")]
#[command(long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Settings file (default: config/test_setting.json under the project root)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Project root; relative settings paths resolve against it
    #[arg(long, global = true)]
    pub root: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the feature suite (same as running without a subcommand)
    Run(RunArgs),

    /// List the units a run would execute
    List(ListArgs),

    /// Convert an existing raw results tree
    Convert(ConvertArgs),

    /// Generate the HTML report from an existing results directory
    Report(ReportArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for a run
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Execution mode (single, sequential, parallel)
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Maximum concurrent units in parallel mode (default: CPU count)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Feature file or folder under the features directory
    #[arg(short, long)]
    pub feature: Option<String>,

    /// Unit granularity (feature, scenario)
    #[arg(short, long, default_value = "feature")]
    pub granularity: String,

    /// Skip HTML report generation
    #[arg(long)]
    pub no_report: bool,

    /// Keep the raw results tree after the run
    #[arg(long)]
    pub keep_temp: bool,

    /// Summary format (table, json, json-pretty, csv, summary)
    #[arg(long, default_value = "table")]
    pub format: String,

    /// Also write the summary to this file
    #[arg(long)]
    pub summary_file: Option<String>,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Feature file or folder under the features directory
    #[arg(short, long)]
    pub feature: Option<String>,

    /// Unit granularity (feature, scenario)
    #[arg(short, long, default_value = "feature")]
    pub granularity: String,

    /// Show the scenario text of each unit
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for convert command
#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Directory holding raw behave JSON files
    pub input: String,

    /// Results directory (default: allure_results_dir)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Generate the HTML report afterwards
    #[arg(long)]
    pub report: bool,
}

/// Arguments for report command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Results directory (default: allure_results_dir)
    #[arg(short, long)]
    pub results: Option<String>,

    /// Report directory (default: allure_report_dir)
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective settings
    Show {
        /// Output format (json, yaml)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Show environment overrides instead
        #[arg(short, long)]
        env: bool,
    },

    /// Write a settings file with the defaults
    Init {
        /// Output path
        #[arg(short, long, default_value = "config/test_setting.json")]
        output: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a settings file
    Validate {
        /// Settings file (default: the file a run would load)
        file: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_run_args() {
        let args = Args::parse_from([
            "feature-runner",
            "--mode",
            "parallel",
            "--workers",
            "4",
            "--feature",
            "login.feature",
            "--no-report",
        ]);
        assert!(args.command.is_none());
        assert_eq!(args.run.mode.as_deref(), Some("parallel"));
        assert_eq!(args.run.workers, Some(4));
        assert_eq!(args.run.feature.as_deref(), Some("login.feature"));
        assert!(args.run.no_report);
        assert_eq!(args.run.granularity, "feature");
        assert_eq!(args.run.format, "table");
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["feature-runner"]);
        assert!(args.command.is_none());
        assert!(args.run.mode.is_none());
        assert!(args.run.workers.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_list_with_global_options() {
        let args = Args::parse_from([
            "feature-runner",
            "list",
            "--granularity",
            "scenario",
            "--detailed",
            "-c",
            "custom.json",
            "-v",
        ]);
        match args.command {
            Some(Command::List(list_args)) => {
                assert_eq!(list_args.granularity, "scenario");
                assert!(list_args.detailed);
            }
            _ => panic!("Expected List command"),
        }
        assert_eq!(args.config.as_deref(), Some("custom.json"));
        assert!(args.verbose);
    }

    #[test]
    fn test_convert_args() {
        let args = Args::parse_from(["feature-runner", "convert", "temp_results", "-o", "out"]);
        match args.command {
            Some(Command::Convert(convert_args)) => {
                assert_eq!(convert_args.input, "temp_results");
                assert_eq!(convert_args.output.as_deref(), Some("out"));
                assert!(!convert_args.report);
            }
            _ => panic!("Expected Convert command"),
        }
    }

    #[test]
    fn test_config_init() {
        let args = Args::parse_from(["feature-runner", "config", "init", "--force"]);
        match args.command {
            Some(Command::Config(ConfigArgs {
                action: ConfigAction::Init { output, force },
            })) => {
                assert_eq!(output, "config/test_setting.json");
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_run_flags_conflict_with_subcommand() {
        let result = Args::try_parse_from(["feature-runner", "--mode", "parallel", "list"]);
        assert!(result.is_err());
    }
}
