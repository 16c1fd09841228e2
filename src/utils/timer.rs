//! Timer utilities
//!
//! Provides timing and measurement helpers.

use std::time::{Duration, Instant};

/// Simple timer for measuring elapsed time
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    /// Create and start a new timer
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            label: label.into(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Stop timer and return elapsed milliseconds
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("{}: {}ms", self.label, elapsed);
        elapsed
    }
}

/// Records how long each phase of a run took
#[derive(Debug)]
pub struct PhaseClock {
    start: Instant,
    mark: Instant,
    phases: Vec<(String, Duration)>,
}

impl PhaseClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            mark: now,
            phases: Vec::new(),
        }
    }

    /// Close the current phase under `label` and start the next one
    pub fn phase(&mut self, label: impl Into<String>) {
        let now = Instant::now();
        self.phases.push((label.into(), now - self.mark));
        self.mark = now;
    }

    pub fn total(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn total_ms(&self) -> u64 {
        self.total().as_millis() as u64
    }

    #[cfg(test)]
    pub fn phases(&self) -> &[(String, Duration)] {
        &self.phases
    }

    /// One-line rendering, e.g. `discovery 3ms | execution 812ms | total 820ms`
    pub fn format(&self) -> String {
        let mut parts: Vec<String> = self
            .phases
            .iter()
            .map(|(label, d)| format!("{} {}ms", label, d.as_millis()))
            .collect();
        parts.push(format!("total {}ms", self.total().as_millis()));
        parts.join(" | ")
    }
}

impl Default for PhaseClock {
    fn default() -> Self {
        Self::new()
    }
}
