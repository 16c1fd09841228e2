//! Schedulable units and their execution outcomes

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// File name of the raw result each unit writes into its output directory
pub const RESULT_FILE_NAME: &str = "results.json";

/// How feature files are sliced into units
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One unit per feature file
    #[default]
    Feature,
    /// One unit per scenario block, sharing the file's header
    Scenario,
}

impl Granularity {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "feature" | "file" => Some(Granularity::Feature),
            "scenario" => Some(Granularity::Scenario),
            _ => None,
        }
    }
}

/// One schedulable slice of test definition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestUnit {
    /// 1-based position, fixed at discovery time
    pub index: usize,
    pub source: PathBuf,
    pub name: String,
    /// Shared preamble of a scenario unit; `None` for whole-file units
    pub header: Option<Vec<String>>,
    pub body: Vec<String>,
    /// 1-based line of the scenario keyword inside `source`
    pub line: Option<usize>,
}

impl TestUnit {
    /// Whole feature file
    pub fn feature(index: usize, source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source.display().to_string());

        Self {
            index,
            source,
            name,
            header: None,
            body: Vec::new(),
            line: None,
        }
    }

    /// Single scenario block extracted from `source`
    pub fn scenario(
        index: usize,
        source: impl Into<PathBuf>,
        name: impl Into<String>,
        header: Vec<String>,
        body: Vec<String>,
        line: usize,
    ) -> Self {
        Self {
            index,
            source: source.into(),
            name: name.into(),
            header: Some(header),
            body,
            line: Some(line),
        }
    }

    pub fn is_scenario(&self) -> bool {
        self.header.is_some()
    }

    /// Path handed to the test process; scenario units use `file:line`
    pub fn target(&self) -> PathBuf {
        match self.line {
            Some(line) => PathBuf::from(format!("{}:{}", self.source.display(), line)),
            None => self.source.clone(),
        }
    }

    /// Feature text for a scenario unit: header followed by the block
    pub fn render(&self) -> Option<String> {
        let header = self.header.as_ref()?;
        let mut text = header.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&self.body.join("\n"));
        text.push('\n');
        Some(text)
    }
}

impl fmt::Display for TestUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scenario() {
            let file = self
                .source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            write!(f, "#{} {} ({})", self.index, self.name, file)
        } else {
            write!(f, "#{} {}", self.index, self.name)
        }
    }
}

/// Outcome of running one unit
#[derive(Clone, Debug, Serialize)]
pub struct ExecutionResult {
    pub index: usize,
    pub unit_name: String,
    pub output_dir: PathBuf,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    /// Spawn, wait or join failure
    pub error: Option<String>,
    pub timed_out: bool,
}

impl ExecutionResult {
    pub fn new(index: usize, unit_name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            index,
            unit_name: unit_name.into(),
            output_dir: output_dir.into(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 0,
            error: None,
            timed_out: false,
        }
    }

    #[cfg(test)]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn success(&self) -> bool {
        self.error.is_none() && !self.timed_out && self.exit_code == Some(0)
    }

    pub fn result_file(&self) -> PathBuf {
        self.output_dir.join(RESULT_FILE_NAME)
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = if self.success() { "✓" } else { "✗" };
        write!(f, "{} #{} {} [{}ms]", symbol, self.index, self.unit_name, self.duration_ms)?;
        if self.timed_out {
            write!(f, " - timed out")?;
        } else if let Some(err) = &self.error {
            write!(f, " - {err}")?;
        } else if let Some(code) = self.exit_code {
            if code != 0 {
                write!(f, " - exit code {code}")?;
            }
        }
        Ok(())
    }
}
