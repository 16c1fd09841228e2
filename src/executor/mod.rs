//! Test execution engine
//!
//! Runs discovered units sequentially or in parallel, each as an isolated
//! external process, and drives the full run pipeline.

mod pipeline;
mod scheduler;
mod unit;
mod workspace;

pub use pipeline::{RunOptions, RunPipeline, EXIT_FAILURE, EXIT_OK};
pub use scheduler::{default_workers, ExecutionMode};
