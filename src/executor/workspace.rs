//! Per-run scratch tree
//!
//! Every unit writes its raw results into its own `result_<index>`
//! directory below the run root. The whole tree is removed when the run
//! finishes, unless it was explicitly kept.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of each unit's output directory
pub const UNIT_DIR_PREFIX: &str = "result_";

/// Scratch tree owned by one run
#[derive(Debug)]
pub struct RunWorkspace {
    root: PathBuf,
    keep: bool,
    cleaned: bool,
}

impl RunWorkspace {
    /// Start from an empty tree at `root`, dropping leftovers of a previous run
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        remove_tree(&root)
            .with_context(|| format!("Failed to clean {}", root.display()))?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create {}", root.display()))?;

        debug!("Workspace ready at {}", root.display());
        Ok(Self {
            root,
            keep: false,
            cleaned: false,
        })
    }

    /// Leave the tree on disk after the run
    pub fn with_keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn unit_dir(&self, index: usize) -> PathBuf {
        self.root.join(format!("{UNIT_DIR_PREFIX}{index}"))
    }

    /// Create the output directory for unit `index`
    pub fn allocate(&self, index: usize) -> io::Result<PathBuf> {
        let dir = self.unit_dir(index);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Remove the tree. Failures are logged and otherwise ignored.
    pub fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;

        if self.keep {
            info!("Keeping raw results at {}", self.root.display());
            return;
        }

        match remove_tree(&self.root) {
            Ok(()) => debug!("Removed {}", self.root.display()),
            Err(e) => debug!("Could not remove {}: {}", self.root.display(), e),
        }
    }
}

impl Drop for RunWorkspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Remove `path` if it exists
pub fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_removes_leftovers() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("temp_results");
        fs::create_dir_all(root.join("result_9")).unwrap();
        fs::write(root.join("result_9/results.json"), "[]").unwrap();

        let workspace = RunWorkspace::create(&root).unwrap();
        assert!(workspace.root().is_dir());
        assert!(!root.join("result_9").exists());
    }

    #[test]
    fn test_allocate_unit_dirs() {
        let dir = tempdir().unwrap();
        let workspace = RunWorkspace::create(dir.path().join("tmp")).unwrap();

        let first = workspace.allocate(1).unwrap();
        let second = workspace.allocate(2).unwrap();
        assert!(first.ends_with("result_1"));
        assert!(second.ends_with("result_2"));
        assert!(first.is_dir() && second.is_dir());
    }

    #[test]
    fn test_drop_removes_tree() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("tmp");
        {
            let workspace = RunWorkspace::create(&root).unwrap();
            workspace.allocate(1).unwrap();
        }
        assert!(!root.exists());
    }

    #[test]
    fn test_keep_leaves_tree() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("tmp");
        {
            let mut workspace = RunWorkspace::create(&root).unwrap().with_keep(true);
            workspace.allocate(3).unwrap();
            workspace.cleanup();
        }
        assert!(root.join("result_3").is_dir());
    }

    #[test]
    fn test_remove_missing_tree_is_ok() {
        let dir = tempdir().unwrap();
        assert!(remove_tree(&dir.path().join("nope")).is_ok());
    }
}
