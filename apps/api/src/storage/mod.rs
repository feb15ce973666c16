//! Blob storage for uploaded job descriptions.
//!
//! Blobs are keyed by a generated stored name (`<hex token>_<original name>`)
//! so that uploads sharing an original file name never collide. The record
//! table is the source of truth; blobs are disposable.

pub mod filename;
pub mod filesystem;

use async_trait::async_trait;
use thiserror::Error;

pub use filesystem::FilesystemBlobStore;

use self::filename::FilenameError;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid stored name '{name}': {reason}")]
    InvalidName { name: String, reason: FilenameError },

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat, name-keyed blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `data` under a freshly generated name and returns that name.
    async fn put(&self, original_name: &str, data: &[u8]) -> Result<String, BlobError>;

    /// Reads a blob. An absent blob is `BlobError::NotFound`, distinct from IO failures.
    async fn get(&self, stored_name: &str) -> Result<Vec<u8>, BlobError>;

    async fn exists(&self, stored_name: &str) -> Result<bool, BlobError>;

    /// Removes a blob; `BlobError::NotFound` if it was already gone.
    async fn delete(&self, stored_name: &str) -> Result<(), BlobError>;
}

/// Outcome of a best-effort blob removal. Callers inspect it, then carry on.
#[derive(Debug)]
pub enum BlobCleanup {
    Removed,
    AlreadyAbsent,
    Failed(BlobError),
}

impl From<Result<(), BlobError>> for BlobCleanup {
    fn from(result: Result<(), BlobError>) -> Self {
        match result {
            Ok(()) => BlobCleanup::Removed,
            Err(BlobError::NotFound(_)) => BlobCleanup::AlreadyAbsent,
            Err(e) => BlobCleanup::Failed(e),
        }
    }
}

/// Generates the on-disk key for an upload: 32 random hex chars, `_`, original name.
pub fn generate_stored_name(original_name: &str) -> String {
    format!("{}_{}", uuid::Uuid::new_v4().simple(), original_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_name_shape() {
        let name = generate_stored_name("spec.pdf");
        let (token, rest) = name.split_once('_').unwrap();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(rest, "spec.pdf");
    }

    #[test]
    fn test_stored_names_are_unique_per_upload() {
        assert_ne!(
            generate_stored_name("spec.pdf"),
            generate_stored_name("spec.pdf")
        );
    }

    #[test]
    fn test_cleanup_classification() {
        assert!(matches!(BlobCleanup::from(Ok(())), BlobCleanup::Removed));
        assert!(matches!(
            BlobCleanup::from(Err(BlobError::NotFound("x".into()))),
            BlobCleanup::AlreadyAbsent
        ));
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            BlobCleanup::from(Err(BlobError::Io(io))),
            BlobCleanup::Failed(_)
        ));
    }
}
