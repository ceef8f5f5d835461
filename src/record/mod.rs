use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::Sample;
use crate::error::Result;

pub const HEADER: [&str; 4] = ["PARAM", "AVG_TIME", "RUN", "FAILED"];

/// Appends samples to a benchmark CSV. Existing rows are never rewritten, so
/// successive invocations for different parameter values build up one file.
pub struct CsvRecorder {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvRecorder {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let needs_header = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(HEADER)?;
            writer.flush()?;
            debug!("Wrote CSV header to {}", path.display());
        }

        Ok(Self { path, writer })
    }

    /// Write one row and flush it, so an interrupted campaign keeps every
    /// completed run.
    pub fn append(&mut self, sample: &Sample) -> Result<()> {
        self.writer.serialize(sample)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
