//! Raw behave JSON records
//!
//! Mirrors the array-of-features document written by `behave -f json`.
//! Only the fields the converter reads are modelled; everything else is ignored.

use serde::{Deserialize, Deserializer};

/// Top-level feature record
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawFeature {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub elements: Vec<RawElement>,
}

/// Scenario or background element inside a feature
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawElement {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<RawStep>,
}

impl RawElement {
    /// Backgrounds are shared preambles, not scenarios
    pub fn is_background(&self) -> bool {
        self.kind.as_deref() == Some("background")
    }

    /// Left out by a line or tag filter: reported as skipped with no step
    /// ever executed
    pub fn was_deselected(&self) -> bool {
        self.status.as_deref() == Some("skipped") && self.steps.iter().all(|s| s.result.is_none())
    }
}

/// A single step record
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawStep {
    #[serde(default, deserialize_with = "null_as_default")]
    pub keyword: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default)]
    pub result: Option<RawStepResult>,
}

/// Step outcome; absent for steps that never ran
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawStepResult {
    #[serde(default)]
    pub status: Option<String>,

    /// Seconds
    #[serde(default)]
    pub duration: Option<f64>,

    #[serde(default)]
    pub error_message: Option<ErrorMessage>,
}

/// behave writes the error either as one string or as a list of lines
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    Text(String),
    Lines(Vec<String>),
}

impl ErrorMessage {
    pub fn to_text(&self) -> String {
        match self {
            ErrorMessage::Text(text) => text.clone(),
            ErrorMessage::Lines(lines) => lines.join("\n"),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
