use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::jobs::board::JobBoard;
use crate::jobs::records::RecordStore;
use crate::storage::FilesystemBlobStore;
use crate::ui::PageRenderer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the session's working copy of the job table.
    pub board: Arc<JobBoard>,
    pub pages: Arc<PageRenderer>,
    pub config: Config,
}

impl AppState {
    /// Wires the stores for the configured locations. Fails only on
    /// environment faults such as an uncreatable upload directory.
    pub async fn from_config(config: Config) -> Result<Self> {
        let blobs = FilesystemBlobStore::new(config.upload_dir.clone())
            .await
            .with_context(|| {
                format!(
                    "Cannot create upload directory '{}'",
                    config.upload_dir.display()
                )
            })?;
        let records = RecordStore::new(config.jobs_csv_path.clone());

        Ok(AppState {
            board: Arc::new(JobBoard::new(records, Arc::new(blobs))),
            pages: Arc::new(PageRenderer::new()?),
            config,
        })
    }
}
