//! Job board orchestration: binds the working copy of the job table to the
//! record store and the blob store.
//!
//! The table is loaded from disk on the first interaction and then kept in
//! memory for the life of the service. Every mutation writes the whole table
//! back through the record store before returning. The mutex serializes
//! interactions inside one process only; two processes sharing the same CSV
//! still overwrite each other (last persist wins).

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use tracing::{debug, info, warn};

use crate::jobs::models::{entry_label, JobEntry, JobTable, TableError};
use crate::jobs::records::{RecordError, RecordStore};
use crate::jobs::validation::{validate, Upload, ValidationError};
use crate::storage::{BlobCleanup, BlobError, BlobStore};

#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Selection(#[from] TableError),

    #[error("No job stored as '{0}'")]
    UnknownJob(String),

    #[error("File missing on disk.")]
    MissingBlob(String),

    #[error("Could not store the uploaded file: {0}")]
    Blob(#[from] BlobError),

    #[error("Could not save the job table: {0}")]
    Record(#[from] RecordError),

    #[error("Record store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// One row of a (possibly filtered) listing.
#[derive(Debug, Clone, Serialize)]
pub struct ListedJob {
    /// Position in the unfiltered table.
    pub position: usize,
    pub label: String,
    pub role: String,
    pub stored_filename: String,
    pub original_filename: String,
    pub blob_present: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobListing {
    pub query: String,
    pub jobs: Vec<ListedJob>,
    /// Row count of the unfiltered table.
    pub total: usize,
}

/// A blob ready to hand back under its original name.
#[derive(Debug)]
pub struct Download {
    pub original_filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub struct JobBoard {
    records: RecordStore,
    blobs: Arc<dyn BlobStore>,
    working_copy: OnceCell<Mutex<JobTable>>,
}

impl JobBoard {
    pub fn new(records: RecordStore, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            records,
            blobs,
            working_copy: OnceCell::new(),
        }
    }

    /// Locks the working copy, loading it from disk on first use.
    async fn table(&self) -> Result<MutexGuard<'_, JobTable>, BoardError> {
        let cell = self
            .working_copy
            .get_or_try_init(|| async move {
                let records = self.records.clone();
                let table = tokio::task::spawn_blocking(move || records.load()).await??;
                info!(
                    path = %self.records.path().display(),
                    rows = table.len(),
                    "working copy loaded"
                );
                Ok::<_, BoardError>(Mutex::new(table))
            })
            .await?;
        Ok(cell.lock().await)
    }

    async fn persist(&self, table: &JobTable) -> Result<(), BoardError> {
        let records = self.records.clone();
        let snapshot = table.clone();
        tokio::task::spawn_blocking(move || records.persist(&snapshot)).await??;
        Ok(())
    }

    /// Removes a blob without letting any failure escape.
    async fn discard_blob(&self, stored_filename: &str) {
        match BlobCleanup::from(self.blobs.delete(stored_filename).await) {
            BlobCleanup::Removed => debug!(stored_filename, "blob removed"),
            BlobCleanup::AlreadyAbsent => debug!(stored_filename, "blob already absent"),
            BlobCleanup::Failed(e) => debug!(stored_filename, error = %e, "blob cleanup failed, ignoring"),
        }
    }

    /// Validates and stores a new job. Nothing changes when validation fails.
    pub async fn add_job(&self, role: &str, upload: Option<Upload>) -> Result<JobEntry, BoardError> {
        let job = validate(role, upload)?;
        let mut table = self.table().await?;

        let stored_filename = self.blobs.put(&job.file_name, &job.bytes).await?;
        let entry = JobEntry {
            role: job.role,
            stored_filename,
            original_filename: job.file_name,
        };
        table.append(entry.clone());

        if let Err(e) = self.persist(&table).await {
            warn!(error = %e, role = %entry.role, "persist failed, rolling back add");
            table.pop();
            self.discard_blob(&entry.stored_filename).await;
            return Err(e);
        }

        info!(role = %entry.role, stored_filename = %entry.stored_filename, "job added");
        Ok(entry)
    }

    /// Filters the working copy by role. Blob presence is checked per row and
    /// never fails the listing.
    pub async fn search(&self, query: &str) -> Result<JobListing, BoardError> {
        let (rows, total) = {
            let table = self.table().await?;
            let rows: Vec<(usize, JobEntry)> = table
                .search(query)
                .into_iter()
                .map(|(i, e)| (i, e.clone()))
                .collect();
            (rows, table.len())
        };

        let mut jobs = Vec::with_capacity(rows.len());
        for (position, entry) in rows {
            let blob_present = match self.blobs.exists(&entry.stored_filename).await {
                Ok(present) => present,
                Err(e) => {
                    debug!(stored_filename = %entry.stored_filename, error = %e, "blob check failed");
                    false
                }
            };
            jobs.push(ListedJob {
                position,
                label: entry_label(position, &entry),
                role: entry.role,
                stored_filename: entry.stored_filename,
                original_filename: entry.original_filename,
                blob_present,
            });
        }

        Ok(JobListing {
            query: query.trim().to_string(),
            jobs,
            total,
        })
    }

    /// Admin selection labels for the full, unfiltered table.
    pub async fn admin_labels(&self) -> Result<Vec<String>, BoardError> {
        Ok(self.table().await?.labels())
    }

    /// Fetches a job's document under its original name.
    pub async fn download(&self, stored_filename: &str) -> Result<Download, BoardError> {
        let entry = {
            let table = self.table().await?;
            let position = table
                .position_of(stored_filename)
                .ok_or_else(|| BoardError::UnknownJob(stored_filename.to_string()))?;
            table.entries()[position].clone()
        };

        let bytes = match self.blobs.get(&entry.stored_filename).await {
            Ok(bytes) => bytes,
            // A name the store refuses can never be on disk; same as a missing file.
            Err(BlobError::NotFound(name) | BlobError::InvalidName { name, .. }) => {
                return Err(BoardError::MissingBlob(name))
            }
            Err(e) => return Err(e.into()),
        };

        let content_type = mime_guess::from_path(&entry.original_filename)
            .first_or_octet_stream()
            .to_string();

        Ok(Download {
            original_filename: entry.original_filename,
            content_type,
            bytes,
        })
    }

    /// Deletes the row an admin label points at, if the label is still current.
    pub async fn delete_by_label(&self, label: &str) -> Result<JobEntry, BoardError> {
        let mut table = self.table().await?;
        let position = table.resolve_label(label)?;
        self.remove(&mut table, position).await
    }

    /// Deletes by stable key rather than position.
    pub async fn delete_by_stored_name(&self, stored_filename: &str) -> Result<JobEntry, BoardError> {
        let mut table = self.table().await?;
        let position = table
            .position_of(stored_filename)
            .ok_or_else(|| BoardError::UnknownJob(stored_filename.to_string()))?;
        self.remove(&mut table, position).await
    }

    async fn remove(&self, table: &mut JobTable, position: usize) -> Result<JobEntry, BoardError> {
        let entry = table.delete(position)?;

        if let Err(e) = self.persist(table).await {
            warn!(error = %e, role = %entry.role, "persist failed, keeping row");
            table.restore(position, entry);
            return Err(e);
        }

        // The row is gone for good; the blob is only cleaned up best-effort.
        self.discard_blob(&entry.stored_filename).await;
        info!(role = %entry.role, stored_filename = %entry.stored_filename, "job deleted");
        Ok(entry)
    }
}
