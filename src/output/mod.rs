//! Output formatting module
//!
//! Renders run summaries and unit listings for the terminal or a file.

mod formatter;

pub use formatter::{write_summary_to_file, OutputFormat, ResultFormatter};
