//! Normalized result models
//!
//! Defines the Allure-shaped scenario and step records, the status
//! vocabulary, and the end-of-run summary.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ExecutionResult;

/// Normalized status vocabulary
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Broken,
    Skipped,
}

impl Status {
    /// Map a raw behave status onto the vocabulary
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "failed" => Status::Failed,
            "error" => Status::Broken,
            "skipped" | "undefined" => Status::Skipped,
            _ => Status::Passed,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Passed => "✓",
            Status::Failed => "✗",
            Status::Broken => "!",
            Status::Skipped => "○",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Broken => "broken",
            Status::Skipped => "skipped",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Failed | Status::Broken)
    }

    /// Rank used when folding step statuses into a scenario status.
    /// Skipped ranks with passed: a skipped step never fails a scenario.
    pub fn severity(&self) -> u8 {
        match self {
            Status::Passed | Status::Skipped => 0,
            Status::Broken => 1,
            Status::Failed => 2,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Passed => write!(f, "PASSED"),
            Status::Failed => write!(f, "FAILED"),
            Status::Broken => write!(f, "BROKEN"),
            Status::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Error message and trace attached to a failed step or scenario
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// Allure label
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One step of a normalized scenario
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedStep {
    pub name: String,
    pub status: Status,
    pub start: u64,
    /// Step duration in milliseconds
    pub stop: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
}

/// Normalized scenario, written as `<uuid>-result.json`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedScenario {
    pub uuid: String,
    pub history_id: String,
    pub name: String,
    pub full_name: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    pub start: u64,
    pub stop: u64,
    pub duration: u64,
    pub steps: Vec<NormalizedStep>,
    pub labels: Vec<Label>,
}

impl NormalizedScenario {
    /// First value of the named label
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    #[cfg(test)]
    pub fn tags(&self) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|l| l.name == "tag")
            .map(|l| l.value.as_str())
            .collect()
    }
}

impl fmt::Display for NormalizedScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.full_name,
            self.duration
        )?;
        if let Some(msg) = self.status_details.as_ref().and_then(|d| d.message.as_ref()) {
            let first_line = msg.lines().next().unwrap_or_default();
            write!(f, " - {first_line}")?;
        }
        Ok(())
    }
}

/// Summary of one run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub units: usize,
    pub units_failed: usize,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub broken: usize,
    pub skipped: usize,
    pub total_duration_ms: u64,
    pub scenarios: Vec<ScenarioLine>,
}

/// Compact per-scenario row carried by the summary
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioLine {
    pub feature: String,
    pub name: String,
    pub status: Status,
    pub duration_ms: u64,
    pub message: Option<String>,
}

impl RunSummary {
    pub fn new(
        executions: &[ExecutionResult],
        scenarios: &[NormalizedScenario],
        total_duration_ms: u64,
    ) -> Self {
        let count = |status: Status| scenarios.iter().filter(|s| s.status == status).count();

        let lines = scenarios
            .iter()
            .map(|s| ScenarioLine {
                feature: s.label("feature").unwrap_or_default().to_string(),
                name: s.name.clone(),
                status: s.status,
                duration_ms: s.duration,
                message: s.status_details.as_ref().and_then(|d| d.message.clone()),
            })
            .collect();

        Self {
            units: executions.len(),
            units_failed: executions.iter().filter(|e| !e.success()).count(),
            total: scenarios.len(),
            passed: count(Status::Passed),
            failed: count(Status::Failed),
            broken: count(Status::Broken),
            skipped: count(Status::Skipped),
            total_duration_ms,
            scenarios: lines,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.total > 0 && self.passed == self.total
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Units: {} ({} with non-zero exit)",
            self.units, self.units_failed
        )?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for line in &self.scenarios {
            writeln!(
                f,
                "  {} {}.{} [{}ms]",
                line.status.symbol(),
                line.feature,
                line.name,
                line.duration_ms
            )?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Passed: {} | Failed: {} | Broken: {} | Skipped: {}",
            self.total, self.passed, self.failed, self.broken, self.skipped
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.total_duration_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scenario(name: &str, status: Status, duration: u64) -> NormalizedScenario {
        NormalizedScenario {
            uuid: format!("uuid-{name}"),
            history_id: String::new(),
            name: name.to_string(),
            full_name: format!("Checkout.{name}"),
            status,
            status_details: None,
            start: 0,
            stop: duration,
            duration,
            steps: Vec::new(),
            labels: vec![Label::new("feature", "Checkout"), Label::new("tag", "smoke")],
        }
    }

    #[test]
    fn test_status_from_raw() {
        assert_eq!(Status::from_raw("failed"), Status::Failed);
        assert_eq!(Status::from_raw("error"), Status::Broken);
        assert_eq!(Status::from_raw("skipped"), Status::Skipped);
        assert_eq!(Status::from_raw("undefined"), Status::Skipped);
        assert_eq!(Status::from_raw("passed"), Status::Passed);
        assert_eq!(Status::from_raw("untested"), Status::Passed);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Broken).unwrap(), "\"broken\"");
    }

    #[test]
    fn test_scenario_serializes_camel_case() {
        let value = serde_json::to_value(scenario("Pay", Status::Passed, 12)).unwrap();
        assert_eq!(value["fullName"], "Checkout.Pay");
        assert!(value.get("historyId").is_some());
        assert!(value.get("statusDetails").is_none());
    }

    #[test]
    fn test_scenario_labels() {
        let s = scenario("Pay", Status::Passed, 12);
        assert_eq!(s.label("feature"), Some("Checkout"));
        assert_eq!(s.tags(), vec!["smoke"]);
    }

    #[test]
    fn test_run_summary() {
        let executions = vec![
            ExecutionResult::new(1, "a.feature", PathBuf::from("result_1")).with_exit_code(0),
            ExecutionResult::new(2, "b.feature", PathBuf::from("result_2")).with_exit_code(1),
        ];
        let scenarios = vec![
            scenario("Pay", Status::Passed, 10),
            scenario("Refund", Status::Failed, 20),
            scenario("Cancel", Status::Skipped, 0),
        ];

        let summary = RunSummary::new(&executions, &scenarios, 42);
        assert_eq!(summary.units, 2);
        assert_eq!(summary.units_failed, 1);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.is_all_passed());
    }
}
