//! Normalized result persistence

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::NormalizedScenario;

/// Suffix of every normalized result file
pub const RESULT_SUFFIX: &str = "-result.json";

/// Writes normalized scenarios into a results directory
#[derive(Clone, Debug)]
pub struct ResultWriter {
    dir: PathBuf,
}

impl ResultWriter {
    /// Writer for `dir`, creating it when missing
    pub fn create(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, scenario: &NormalizedScenario) -> PathBuf {
        self.dir.join(format!("{}{}", scenario.uuid, RESULT_SUFFIX))
    }

    /// Write `scenario` as pretty JSON to `<uuid>-result.json`
    pub fn write(&self, scenario: &NormalizedScenario) -> io::Result<PathBuf> {
        let path = self.path_for(scenario);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, scenario)?;
        writer.flush()?;
        Ok(path)
    }
}

/// Normalized result files currently in `dir`
pub fn result_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_result = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(RESULT_SUFFIX))
            .unwrap_or(false);
        if is_result {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
