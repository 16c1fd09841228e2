//! Scenario block extraction
//!
//! Splits a feature file into its shared header and one block per scenario,
//! so each scenario can run as its own unit.

/// Keywords that open a scenario block
const SCENARIO_KEYWORDS: &[&str] = &[
    "Scenario Outline:",
    "Scenario Template:",
    "Scenario:",
    "Example:",
];

/// One scenario, including the tags and comments directly above it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioBlock {
    pub name: String,
    /// 1-based line of the scenario keyword
    pub line: usize,
    pub lines: Vec<String>,
}

/// A feature file cut into header and scenario blocks
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitFeature {
    /// Everything before the first block: `Feature:`, description, `Background:`
    pub header: Vec<String>,
    pub scenarios: Vec<ScenarioBlock>,
}

/// Split feature text into header and scenario blocks
pub fn split_scenarios(text: &str) -> SplitFeature {
    let lines: Vec<&str> = text.lines().collect();

    let keyword_lines: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| scenario_keyword(line).is_some())
        .map(|(i, _)| i)
        .collect();

    if keyword_lines.is_empty() {
        return SplitFeature {
            header: to_owned(&lines),
            scenarios: Vec::new(),
        };
    }

    // Pull each block's start up over tag and comment lines directly above it
    let mut starts = Vec::with_capacity(keyword_lines.len());
    let mut floor = 0;
    for &keyword_line in &keyword_lines {
        let mut start = keyword_line;
        while start > floor && is_annotation(lines[start - 1]) {
            start -= 1;
        }
        starts.push(start);
        floor = keyword_line + 1;
    }

    let scenarios = starts
        .iter()
        .zip(&keyword_lines)
        .enumerate()
        .map(|(n, (&start, &keyword_line))| {
            let end = starts.get(n + 1).copied().unwrap_or(lines.len());
            ScenarioBlock {
                name: scenario_name(lines[keyword_line], n + 1),
                line: keyword_line + 1,
                lines: to_owned(&lines[start..end]),
            }
        })
        .collect();

    SplitFeature {
        header: to_owned(&lines[..starts[0]]),
        scenarios,
    }
}

fn scenario_keyword(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    SCENARIO_KEYWORDS
        .iter()
        .find(|keyword| trimmed.starts_with(*keyword))
        .copied()
}

fn is_annotation(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with('@') || trimmed.starts_with('#')
}

fn scenario_name(line: &str, position: usize) -> String {
    let name = line
        .split_once(':')
        .map(|(_, rest)| rest.trim())
        .unwrap_or_default();

    if name.is_empty() {
        format!("Scenario {position}")
    } else {
        name.to_string()
    }
}

fn to_owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
}
