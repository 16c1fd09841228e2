//! Unit scheduling
//!
//! Runs discovered units one after another or concurrently under a worker
//! limit. Either way every unit yields exactly one result, returned in
//! index order.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use super::unit::UnitExecutor;
use super::workspace::RunWorkspace;
use crate::models::{ExecutionResult, TestUnit};

/// How units are dispatched
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One unit at a time
    #[default]
    Sequential,
    /// Up to `workers` units at a time
    Parallel,
}

impl ExecutionMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single" | "sequential" | "serial" => Some(ExecutionMode::Sequential),
            "parallel" => Some(ExecutionMode::Parallel),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Parallel => "parallel",
        }
    }
}

/// Worker count used when none is requested
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
}

/// Dispatches units to a [`UnitExecutor`]
pub struct Scheduler {
    executor: Arc<UnitExecutor>,
    mode: ExecutionMode,
    workers: usize,
}

impl Scheduler {
    pub fn new(executor: UnitExecutor, mode: ExecutionMode) -> Self {
        Self {
            executor: Arc::new(executor),
            mode,
            workers: default_workers(),
        }
    }

    /// Concurrency limit for parallel mode; zero is treated as one
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every unit and return one result per unit, sorted by index
    pub async fn run(&self, units: Vec<TestUnit>, workspace: &RunWorkspace) -> Vec<ExecutionResult> {
        let mut results = match self.mode {
            ExecutionMode::Sequential => self.run_sequential(units, workspace).await,
            ExecutionMode::Parallel => self.run_parallel(units, workspace).await,
        };

        results.sort_by_key(|r| r.index);
        results
    }

    async fn run_sequential(
        &self,
        units: Vec<TestUnit>,
        workspace: &RunWorkspace,
    ) -> Vec<ExecutionResult> {
        let total = units.len();
        let mut results = Vec::with_capacity(total);

        for (n, unit) in units.iter().enumerate() {
            info!("[{}/{}] {}", n + 1, total, unit.name);

            let result = match workspace.allocate(unit.index) {
                Ok(dir) => self.executor.run(unit, &dir).await,
                Err(e) => allocation_failure(unit, workspace, e),
            };
            results.push(result);
        }

        results
    }

    async fn run_parallel(
        &self,
        units: Vec<TestUnit>,
        workspace: &RunWorkspace,
    ) -> Vec<ExecutionResult> {
        info!(
            "Running {} unit(s) in parallel (max {} concurrent)",
            units.len(),
            self.workers
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut results = Vec::with_capacity(units.len());
        let mut pending = Vec::new();
        let mut handles = Vec::new();

        for unit in units {
            let dir = match workspace.allocate(unit.index) {
                Ok(dir) => dir,
                Err(e) => {
                    results.push(allocation_failure(&unit, workspace, e));
                    continue;
                }
            };

            let semaphore = semaphore.clone();
            let executor = self.executor.clone();
            pending.push((unit.index, unit.name.clone(), dir.clone()));

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return ExecutionResult::new(unit.index, unit.name.clone(), dir)
                            .with_error(format!("scheduler closed: {e}"))
                    }
                };

                debug!("Starting {}", unit);
                executor.run(&unit, &dir).await
            });

            handles.push(handle);
        }

        let joined = join_all(handles).await;

        for ((index, name, dir), outcome) in pending.into_iter().zip(joined) {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!("{} - worker failed: {}", name, e);
                    results.push(
                        ExecutionResult::new(index, name, dir)
                            .with_error(format!("worker failed: {e}")),
                    );
                }
            }
        }

        results
    }
}

fn allocation_failure(
    unit: &TestUnit,
    workspace: &RunWorkspace,
    e: std::io::Error,
) -> ExecutionResult {
    let dir = workspace.unit_dir(unit.index);
    error!("{} - cannot create {}: {}", unit.name, dir.display(), e);
    ExecutionResult::new(unit.index, unit.name.clone(), dir)
        .with_error(format!("cannot create output directory: {e}"))
}
