//! Output formatters for run summaries
//!
//! Provides table, JSON, CSV and one-line summary output.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::models::{ExecutionResult, RunSummary, ScenarioLine, Status, TestUnit};
use crate::utils::text::truncate;

/// Width of the scenario column in table output
const NAME_WIDTH: usize = 48;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn status_label(&self, status: Status) -> String {
        let plain = format!("{} {}", status.symbol(), status);
        if !self.colorize {
            return plain;
        }
        let color = match status {
            Status::Passed => "32",
            Status::Failed | Status::Broken => "31",
            Status::Skipped => "33",
        };
        format!("\x1b[{color}m{plain}\x1b[0m")
    }

    /// Format one scenario row
    pub fn format_scenario(&self, line: &ScenarioLine) -> String {
        let name = truncate(&format!("{}.{}", line.feature, line.name), NAME_WIDTH);
        format!(
            "{:width$} {} [{:>6}ms]",
            name,
            self.status_label(line.status),
            line.duration_ms,
            width = NAME_WIDTH
        )
    }

    /// Format the end-of-run summary
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Csv => self.format_summary_csv(summary).unwrap_or_default(),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!(
            "║  Test Results: {} unit(s), {} with non-zero exit\n",
            summary.units, summary.units_failed
        ));
        output.push_str("╠══════════════════════════════════════════════════════════════════════╣\n");

        for line in &summary.scenarios {
            output.push_str(&format!("║  {}\n", self.format_scenario(line)));
            if let Some(message) = line.message.as_deref().filter(|_| line.status.is_failure()) {
                let first = message.lines().next().unwrap_or_default();
                output.push_str(&format!("║      {}\n", truncate(first, 64)));
            }
        }

        output.push_str("╠══════════════════════════════════════════════════════════════════════╣\n");

        let pass_str = if self.colorize {
            format!("\x1b[32m{}\x1b[0m", summary.passed)
        } else {
            summary.passed.to_string()
        };
        let fail_str = if self.colorize && summary.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", summary.failed)
        } else {
            summary.failed.to_string()
        };

        output.push_str(&format!(
            "║  Total: {:3} | Pass: {} | Fail: {} | Broken: {:3} | Skip: {:3}\n",
            summary.total, pass_str, fail_str, summary.broken, summary.skipped
        ));
        output.push_str(&format!(
            "║  Pass Rate: {:5.1}% | Duration: {:8}ms\n",
            summary.pass_rate(),
            summary.total_duration_ms
        ));
        output.push_str("╚══════════════════════════════════════════════════════════════════════╝\n");

        output
    }

    fn format_summary_csv(&self, summary: &RunSummary) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer.write_record(["feature", "scenario", "status", "duration_ms", "message"])?;
        for line in &summary.scenarios {
            let duration = line.duration_ms.to_string();
            writer.write_record([
                line.feature.as_str(),
                line.name.as_str(),
                line.status.as_str(),
                duration.as_str(),
                line.message.as_deref().unwrap_or(""),
            ])?;
        }

        let bytes = writer.into_inner().context("Failed to flush CSV output")?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        format!(
            "{}/{} scenario(s) passed ({:.1}%), {} failed, {} broken, {} skipped in {}ms",
            summary.passed,
            summary.total,
            summary.pass_rate(),
            summary.failed,
            summary.broken,
            summary.skipped,
            summary.total_duration_ms
        )
    }

    /// Format per-unit execution lines
    pub fn format_executions(&self, executions: &[ExecutionResult]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(executions).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(executions).unwrap_or_default(),
            _ => executions
                .iter()
                .map(|e| format!("  {e}\n"))
                .collect(),
        }
    }

    /// Format discovered units for `list`
    pub fn format_units(&self, units: &[TestUnit], detailed: bool) -> String {
        let mut output = String::new();
        output.push_str("\n📋 Discovered Units\n");
        output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

        for unit in units {
            output.push_str(&format!("  {:>3}. {}\n", unit.index, unit.name));
            output.push_str(&format!("       {}\n", unit.target().display()));
            if detailed {
                if let Some(text) = unit.render() {
                    for line in text.lines() {
                        output.push_str(&format!("       │ {line}\n"));
                    }
                }
            }
        }

        output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        output.push_str(&format!("  {} unit(s)\n", units.len()));
        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Write a summary to a file
pub fn write_summary_to_file(path: &Path, summary: &RunSummary, format: OutputFormat) -> Result<()> {
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_summary(summary);

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
