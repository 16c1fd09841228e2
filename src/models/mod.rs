//! Data models for feature execution and reporting
//!
//! This module contains all data structures used throughout the application.

mod raw;
mod scenario;
mod unit;

pub use raw::{RawElement, RawFeature, RawStep};
pub use scenario::{
    Label, NormalizedScenario, NormalizedStep, RunSummary, ScenarioLine, Status, StatusDetails,
};
pub use unit::{ExecutionResult, Granularity, TestUnit};
