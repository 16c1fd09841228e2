//! Raw result conversion
//!
//! Turns the behave JSON documents left in the raw results tree into
//! normalized scenario records. A malformed file is skipped with a
//! warning; it never stops the rest of the batch.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::models::{
    Label, NormalizedScenario, NormalizedStep, RawElement, RawFeature, RawStep, Status,
    StatusDetails,
};
use crate::report::ResultWriter;
use crate::utils::text::{preview, PREVIEW_CHARS};

const DEFAULT_FEATURE_NAME: &str = "Feature";
const DEFAULT_SCENARIO_NAME: &str = "Scenario";

/// Per-file conversion errors
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of converting one raw results tree
#[derive(Debug, Default)]
pub struct Conversion {
    /// Scenarios that were written
    pub scenarios: Vec<NormalizedScenario>,
    /// Raw files found
    pub files: usize,
    /// Raw files that could not be converted
    pub skipped: Vec<PathBuf>,
}

impl Conversion {
    pub fn written(&self) -> usize {
        self.scenarios.len()
    }
}

/// Converts behave JSON into normalized scenarios
#[derive(Clone, Debug, Default)]
pub struct ResultConverter;

impl ResultConverter {
    pub fn new() -> Self {
        Self
    }

    /// Every `*.json` file below `raw_root`, in path order
    pub fn collect_files(&self, raw_root: &Path) -> Vec<PathBuf> {
        WalkDir::new(raw_root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect()
    }

    /// Convert every raw file below `raw_root` and write the results
    pub fn convert_dir(&self, raw_root: &Path, writer: &ResultWriter) -> Conversion {
        let files = self.collect_files(raw_root);
        info!("Collected {} raw result file(s)", files.len());

        let mut conversion = Conversion {
            files: files.len(),
            ..Default::default()
        };

        for path in files {
            let scenarios = match self.parse_file(&path) {
                Ok(scenarios) => scenarios,
                Err(e) => {
                    warn!("Could not convert {}: {}", file_label(&path), e);
                    conversion.skipped.push(path);
                    continue;
                }
            };

            for scenario in scenarios {
                match writer.write(&scenario) {
                    Ok(out) => {
                        debug!("Wrote {}", out.display());
                        info!("Converted: {}", scenario.name);
                        conversion.scenarios.push(scenario);
                    }
                    Err(e) => warn!("Could not write result for {}: {}", scenario.full_name, e),
                }
            }
        }

        conversion
    }

    /// Parse one raw document. A valid document that is not an array yields nothing.
    pub fn parse_file(&self, path: &Path) -> Result<Vec<NormalizedScenario>, ConvertError> {
        let bytes = fs::read(path).map_err(|source| ConvertError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_err = |source| ConvertError::Parse {
            path: path.to_path_buf(),
            source,
        };

        let document: serde_json::Value = serde_json::from_slice(&bytes).map_err(parse_err)?;
        if !document.is_array() {
            debug!("{} is not a feature list, ignoring", path.display());
            return Ok(Vec::new());
        }

        let features: Vec<RawFeature> = serde_json::from_value(document).map_err(parse_err)?;
        Ok(self.convert_features(&features))
    }

    pub fn convert_features(&self, features: &[RawFeature]) -> Vec<NormalizedScenario> {
        features
            .iter()
            .flat_map(|feature| {
                let feature_name = feature.name.as_deref().unwrap_or(DEFAULT_FEATURE_NAME);
                feature
                    .elements
                    .iter()
                    .filter(|e| !e.is_background() && !e.was_deselected())
                    .map(move |e| self.build_scenario(e, feature_name))
            })
            .collect()
    }

    /// Fold one element into a scenario record.
    ///
    /// Status starts at passed and only moves up (broken, then failed).
    /// A raw element status of `failed` or `error` overrides the steps.
    pub fn build_scenario(&self, element: &RawElement, feature_name: &str) -> NormalizedScenario {
        let name = element
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_SCENARIO_NAME.to_string());
        let full_name = format!("{feature_name}.{name}");

        let mut status = Status::Passed;
        let mut details: Option<StatusDetails> = None;
        let mut duration = 0;
        let mut steps = Vec::with_capacity(element.steps.len());

        for raw in &element.steps {
            let (step, error) = self.build_step(raw);
            duration += step.stop;

            if step.status.severity() > status.severity() {
                status = step.status;
            }
            if details.is_none() {
                details = error;
            }
            steps.push(step);
        }

        match element.status.as_deref() {
            Some("failed") => status = Status::Failed,
            Some("error") => status = Status::Broken,
            _ => {}
        }

        NormalizedScenario {
            uuid: uuid::Uuid::new_v4().to_string(),
            history_id: history_id(&full_name),
            labels: labels(feature_name, &element.tags),
            name,
            full_name,
            status,
            status_details: details,
            start: 0,
            stop: duration,
            duration,
            steps,
        }
    }

    /// Step record plus the scenario-level error it carries, if any
    fn build_step(&self, raw: &RawStep) -> (NormalizedStep, Option<StatusDetails>) {
        let result = raw.result.as_ref();
        let raw_status = result
            .and_then(|r| r.status.as_deref())
            .unwrap_or("passed");
        let seconds = result.and_then(|r| r.duration).unwrap_or(0.0);

        let mut step = NormalizedStep {
            name: format!("{}{}", raw.keyword, raw.name),
            status: Status::from_raw(raw_status),
            start: 0,
            stop: to_millis(seconds),
            status_details: None,
        };

        if !matches!(raw_status, "failed" | "error") {
            return (step, None);
        }

        let message = result
            .and_then(|r| r.error_message.as_ref())
            .map(|m| m.to_text())
            .unwrap_or_default();
        if message.is_empty() {
            return (step, None);
        }

        step.status_details = Some(StatusDetails {
            message: Some(preview(&message, PREVIEW_CHARS).to_string()),
            trace: Some(message),
        });

        let details = step.status_details.clone();
        (step, details)
    }
}

/// Seconds to whole milliseconds; negative or non-finite input gives 0
fn to_millis(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0) as u64
    } else {
        0
    }
}

/// Stable id Allure uses to correlate a scenario across runs
pub fn history_id(full_name: &str) -> String {
    hex::encode(Sha256::digest(full_name.as_bytes()))
}

fn labels(feature_name: &str, tags: &[String]) -> Vec<Label> {
    let mut labels = vec![
        Label::new("feature", feature_name),
        Label::new("language", "gherkin"),
        Label::new("suite", feature_name),
    ];
    labels.extend(tags.iter().map(|tag| Label::new("tag", tag.as_str())));
    labels
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn step(keyword: &str, name: &str, status: &str, duration: Option<f64>) -> serde_json::Value {
        let mut result = json!({ "status": status });
        if let Some(d) = duration {
            result["duration"] = json!(d);
        }
        json!({ "keyword": keyword, "name": name, "result": result })
    }

    fn feature(elements: Vec<serde_json::Value>) -> Vec<RawFeature> {
        serde_json::from_value(json!([{ "name": "Login", "elements": elements }])).unwrap()
    }

    fn convert_one(element: serde_json::Value) -> NormalizedScenario {
        let mut scenarios = ResultConverter::new().convert_features(&feature(vec![element]));
        assert_eq!(scenarios.len(), 1);
        scenarios.remove(0)
    }

    #[test]
    fn test_passed_scenario() {
        let scenario = convert_one(json!({
            "type": "scenario",
            "name": "Valid login",
            "status": "passed",
            "tags": ["smoke", "login"],
            "steps": [
                step("Given ", "the login page", "passed", Some(0.25)),
                step("When ", "I log in", "passed", Some(1.0055)),
            ]
        }));

        assert_eq!(scenario.status, Status::Passed);
        assert_eq!(scenario.full_name, "Login.Valid login");
        assert_eq!(scenario.steps[0].name, "Given the login page");
        assert_eq!(scenario.steps[0].stop, 250);
        assert_eq!(scenario.steps[1].stop, 1005);
        assert_eq!(scenario.duration, 1255);
        assert_eq!(scenario.stop, scenario.duration);
        assert_eq!(scenario.start, 0);
        assert!(scenario.status_details.is_none());
        assert_eq!(scenario.label("feature"), Some("Login"));
        assert_eq!(scenario.label("language"), Some("gherkin"));
        assert_eq!(scenario.label("suite"), Some("Login"));
        assert_eq!(scenario.tags(), vec!["smoke", "login"]);
    }

    #[test]
    fn test_failed_step_wins() {
        let scenario = convert_one(json!({
            "name": "S",
            "steps": [
                step("Given ", "a", "passed", Some(0.1)),
                step("When ", "b", "passed", Some(0.1)),
                step("Then ", "c", "failed", Some(0.1)),
            ]
        }));
        assert_eq!(scenario.status, Status::Failed);
    }

    #[test]
    fn test_skipped_step_keeps_passed() {
        let scenario = convert_one(json!({
            "name": "S",
            "steps": [
                step("Given ", "a", "passed", Some(0.1)),
                step("Then ", "b", "skipped", None),
            ]
        }));
        assert_eq!(scenario.status, Status::Passed);
        assert_eq!(scenario.steps[1].status, Status::Skipped);
    }

    #[test]
    fn test_error_step_is_broken_and_never_downgrades_failed() {
        let broken = convert_one(json!({
            "name": "S",
            "steps": [ step("Given ", "a", "error", Some(0.1)) ]
        }));
        assert_eq!(broken.status, Status::Broken);
        assert_eq!(broken.steps[0].status, Status::Broken);

        let failed = convert_one(json!({
            "name": "S",
            "steps": [
                step("Given ", "a", "failed", Some(0.1)),
                step("When ", "b", "error", Some(0.1)),
            ]
        }));
        assert_eq!(failed.status, Status::Failed);
    }

    #[test]
    fn test_element_status_overrides_steps() {
        let errored = convert_one(json!({
            "name": "S",
            "status": "error",
            "steps": [ step("Given ", "a", "passed", Some(0.1)) ]
        }));
        assert_eq!(errored.status, Status::Broken);

        let failed = convert_one(json!({
            "name": "S",
            "status": "failed",
            "steps": [ step("Given ", "a", "passed", Some(0.1)) ]
        }));
        assert_eq!(failed.status, Status::Failed);
    }

    #[test]
    fn test_absent_duration_is_zero() {
        let scenario = convert_one(json!({
            "name": "S",
            "steps": [
                { "keyword": "Given ", "name": "never ran" },
                { "keyword": "When ", "name": "null", "result": { "status": "passed", "duration": null } },
            ]
        }));
        assert_eq!(scenario.steps[0].stop, 0);
        assert_eq!(scenario.steps[1].stop, 0);
        assert_eq!(scenario.duration, 0);
        assert_eq!(scenario.status, Status::Passed);
    }

    #[test]
    fn test_error_details_first_failure_kept() {
        let long = "x".repeat(800);
        let scenario = convert_one(json!({
            "name": "S",
            "steps": [
                { "keyword": "Given ", "name": "a", "result": {
                    "status": "failed", "duration": 0.1,
                    "error_message": ["Assertion failed", long.clone()]
                }},
                { "keyword": "Then ", "name": "b", "result": {
                    "status": "error", "duration": 0.1,
                    "error_message": "second"
                }},
            ]
        }));

        let details = scenario.status_details.as_ref().unwrap();
        let full = format!("Assertion failed\n{long}");
        let message = details.message.as_deref().unwrap();
        assert_eq!(message.chars().count(), PREVIEW_CHARS);
        assert!(full.starts_with(message));
        assert_eq!(details.trace.as_deref(), Some(full.as_str()));

        let step_details = scenario.steps[0].status_details.as_ref().unwrap();
        assert_eq!(step_details.message.as_ref().unwrap().chars().count(), PREVIEW_CHARS);
        assert_eq!(step_details.trace.as_deref(), Some(full.as_str()));

        let second = scenario.steps[1].status_details.as_ref().unwrap();
        assert_eq!(second.message.as_deref(), Some("second"));
    }

    #[test]
    fn test_background_skipped_and_defaults() {
        let features: Vec<RawFeature> = serde_json::from_value(json!([{
            "elements": [
                { "type": "background", "name": "setup", "steps": [] },
                { "type": "scenario", "steps": [] },
            ]
        }]))
        .unwrap();

        let scenarios = ResultConverter::new().convert_features(&features);
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].full_name, "Feature.Scenario");
    }

    #[test]
    fn test_short_error_message_not_cut() {
        let scenario = convert_one(json!({
            "name": "S",
            "steps": [ { "keyword": "Then ", "name": "a", "result": {
                "status": "failed", "error_message": "expected 2, got 3"
            }} ]
        }));
        let details = scenario.status_details.unwrap();
        assert_eq!(details.message.as_deref(), Some("expected 2, got 3"));
        assert_eq!(details.trace.as_deref(), Some("expected 2, got 3"));
    }

    #[test]
    fn test_deselected_sibling_dropped() {
        let features: Vec<RawFeature> = serde_json::from_value(json!([{
            "name": "Login",
            "elements": [
                { "type": "scenario", "name": "One", "status": "passed", "steps": [
                    step("Given ", "a", "passed", Some(0.1))
                ]},
                { "type": "scenario", "name": "Two", "status": "skipped", "steps": [
                    { "keyword": "Given ", "name": "b" }
                ]},
                { "type": "scenario", "name": "Three", "status": "skipped", "steps": [
                    step("Given ", "c", "skipped", None)
                ]},
            ]
        }]))
        .unwrap();

        let scenarios = ResultConverter::new().convert_features(&features);
        let names: Vec<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["One", "Three"]);
        assert_eq!(scenarios[1].steps[0].status, Status::Skipped);
    }

    #[test]
    fn test_history_id_is_stable() {
        let a = convert_one(json!({ "name": "S", "steps": [] }));
        let b = convert_one(json!({ "name": "S", "steps": [] }));
        assert_ne!(a.uuid, b.uuid);
        assert_eq!(a.history_id, b.history_id);
        assert_eq!(a.history_id, history_id("Login.S"));
        assert_eq!(a.history_id.len(), 64);
    }

    #[test]
    fn test_convert_dir_skips_malformed() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("temp_results");
        for (sub, content) in [
            ("result_1", r#"[{"name": "A", "elements": [{"name": "one", "steps": []}]}]"#),
            ("result_2", "{ not json"),
            ("result_3", r#"{"name": "not a list"}"#),
            ("result_4", r#"[{"name": "B", "elements": [{"name": "two", "steps": []}, {"name": "three", "steps": []}]}]"#),
        ] {
            fs::create_dir_all(raw.join(sub)).unwrap();
            fs::write(raw.join(sub).join("results.json"), content).unwrap();
        }

        let writer = ResultWriter::create(dir.path().join("allure_results")).unwrap();
        let conversion = ResultConverter::new().convert_dir(&raw, &writer);

        assert_eq!(conversion.files, 4);
        assert_eq!(conversion.written(), 3);
        assert_eq!(conversion.skipped.len(), 1);
        assert!(conversion.skipped[0].starts_with(raw.join("result_2")));
        assert_eq!(
            crate::report::result_files(writer.dir()).unwrap().len(),
            3
        );
    }

    #[test]
    fn test_convert_dir_missing_root() {
        let dir = tempdir().unwrap();
        let writer = ResultWriter::create(dir.path().join("out")).unwrap();
        let conversion = ResultConverter::new().convert_dir(&dir.path().join("nope"), &writer);
        assert_eq!(conversion.files, 0);
        assert_eq!(conversion.written(), 0);
    }
}
