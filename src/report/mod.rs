//! Result persistence and HTML report generation

mod generator;
mod writer;

pub use generator::{ReportGenerator, ReportOutcome};
pub use writer::{result_files, ResultWriter};
