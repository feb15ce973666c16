//! CSV-backed record store for the job table.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::jobs::models::{JobEntry, JobTable, COLUMNS};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("job table {path} is missing column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("job table CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("job table IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads and writes the job table file. Holds no rows itself.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every row in file order. A missing file is an empty table.
    pub fn load(&self) -> Result<JobTable, RecordError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no job table yet, starting empty");
            return Ok(JobTable::default());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        for column in COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(RecordError::MissingColumn {
                    path: self.path.clone(),
                    column,
                });
            }
        }

        let entries = reader
            .deserialize::<JobEntry>()
            .collect::<Result<Vec<_>, _>>()?;
        debug!(path = %self.path.display(), rows = entries.len(), "job table loaded");
        Ok(JobTable::new(entries))
    }

    /// Writes the whole table, replacing the file in one rename so readers
    /// never observe a half-written table.
    pub fn persist(&self, table: &JobTable) -> Result<(), RecordError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        {
            // Header written by hand so an empty table still carries the schema.
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(tmp.as_file_mut());
            writer.write_record(COLUMNS)?;
            for entry in table.entries() {
                writer.serialize(entry)?;
            }
            writer.flush()?;
        }
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), rows = table.len(), "job table persisted");
        Ok(())
    }
}
