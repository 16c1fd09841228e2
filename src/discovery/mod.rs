//! Feature discovery
//!
//! Resolves a feature selector into an ordered list of test units.

mod splitter;

use splitter::split_scenarios;

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{Granularity, TestUnit};

/// Extension of Gherkin feature files
pub const FEATURE_EXTENSION: &str = "feature";

/// Discovery errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Features directory not found: {0}")]
    BaseDirMissing(PathBuf),

    #[error("Feature file not found: {0}")]
    FileNotFound(String),

    #[error("No feature files found in {0}")]
    NoFeatures(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Discovers feature files under a base directory
#[derive(Clone, Debug)]
pub struct FeatureDiscovery {
    base_dir: PathBuf,
    granularity: Granularity,
}

impl FeatureDiscovery {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            granularity: Granularity::Feature,
        }
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Resolve `selector` into indexed units.
    ///
    /// - `None`: every feature file directly under the base directory
    /// - `"*.feature"`: one file, relative to the base directory first, then as given
    /// - anything else: a sub-folder of the base directory
    pub fn discover(&self, selector: Option<&str>) -> Result<Vec<TestUnit>, DiscoveryError> {
        let files = self.feature_files(selector)?;

        let units = match self.granularity {
            Granularity::Feature => files
                .into_iter()
                .enumerate()
                .map(|(i, path)| TestUnit::feature(i + 1, path))
                .collect::<Vec<_>>(),
            Granularity::Scenario => self.scenario_units(&files)?,
        };

        if units.is_empty() {
            return Err(DiscoveryError::NoFeatures(self.selection_dir(selector)));
        }

        info!(
            "Discovered {} unit(s) from {}",
            units.len(),
            self.base_dir.display()
        );
        Ok(units)
    }

    /// Ordered feature file paths for `selector`
    pub fn feature_files(&self, selector: Option<&str>) -> Result<Vec<PathBuf>, DiscoveryError> {
        if !self.base_dir.is_dir() {
            return Err(DiscoveryError::BaseDirMissing(self.base_dir.clone()));
        }

        if let Some(file) = selector.filter(|s| is_feature_file_name(s)) {
            return self.resolve_file(file).map(|path| vec![path]);
        }

        let dir = self.selection_dir(selector);
        let mut files = list_feature_files(&dir)?;
        files.sort();

        if files.is_empty() {
            return Err(DiscoveryError::NoFeatures(dir));
        }

        debug!("Found {} feature file(s) in {}", files.len(), dir.display());
        Ok(files)
    }

    fn selection_dir(&self, selector: Option<&str>) -> PathBuf {
        match selector {
            Some(folder) if !is_feature_file_name(folder) => self.base_dir.join(folder),
            _ => self.base_dir.clone(),
        }
    }

    fn resolve_file(&self, selector: &str) -> Result<PathBuf, DiscoveryError> {
        let mut relative = selector;
        while let Some(stripped) = relative.strip_prefix("./") {
            relative = stripped;
        }

        let candidate = self.base_dir.join(relative);
        let path = if candidate.exists() {
            candidate
        } else {
            PathBuf::from(selector)
        };

        if path.is_file() {
            Ok(path)
        } else {
            Err(DiscoveryError::FileNotFound(selector.to_string()))
        }
    }

    fn scenario_units(&self, files: &[PathBuf]) -> Result<Vec<TestUnit>, DiscoveryError> {
        let mut units = Vec::new();

        for path in files {
            let text = fs::read_to_string(path).map_err(|source| DiscoveryError::Io {
                path: path.clone(),
                source,
            })?;

            let split = split_scenarios(&text);
            if split.scenarios.is_empty() {
                debug!("No scenarios in {}", path.display());
                continue;
            }

            for block in split.scenarios {
                units.push(TestUnit::scenario(
                    units.len() + 1,
                    path.clone(),
                    block.name,
                    split.header.clone(),
                    block.lines,
                    block.line,
                ));
            }
        }

        Ok(units)
    }
}

fn is_feature_file_name(selector: &str) -> bool {
    selector.ends_with(&format!(".{FEATURE_EXTENSION}"))
}

/// Direct `*.feature` children of `dir`; a missing directory yields none
fn list_feature_files(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|source| DiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DiscoveryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if path.is_file()
            && path
                .extension()
                .map(|e| e == FEATURE_EXTENSION)
                .unwrap_or(false)
        {
            files.push(path);
        }
    }

    Ok(files)
}
