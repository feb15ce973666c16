use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::filename::validate_flat_filename;
use super::{generate_stored_name, BlobError, BlobStore};

/// Blob store over a single flat directory: `{base_path}/{stored_name}`.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
}

impl FilesystemBlobStore {
    /// Creates the store, making sure the directory exists.
    pub async fn new(base_path: PathBuf) -> Result<Self, BlobError> {
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    /// Path for a stored name. Names that could leave the directory are rejected.
    fn blob_path(&self, stored_name: &str) -> Result<PathBuf, BlobError> {
        let name = validate_flat_filename(stored_name).map_err(|reason| BlobError::InvalidName {
            name: stored_name.to_string(),
            reason,
        })?;
        Ok(self.base_path.join(name))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, original_name: &str, data: &[u8]) -> Result<String, BlobError> {
        let stored_name = generate_stored_name(original_name);
        let path = self.blob_path(&stored_name)?;

        // The directory may have been removed since startup.
        fs::create_dir_all(&self.base_path).await?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        if let Err(e) = file.write_all(data).await {
            drop(file);
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }
        file.flush().await?;

        debug!(stored_name = %stored_name, bytes = data.len(), "blob written");
        Ok(stored_name)
    }

    async fn get(&self, stored_name: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.blob_path(stored_name)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(stored_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, stored_name: &str) -> Result<bool, BlobError> {
        let path = self.blob_path(stored_name)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete(&self, stored_name: &str) -> Result<(), BlobError> {
        let path = self.blob_path(stored_name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(stored_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store() -> (TempDir, FilesystemBlobStore) {
        let dir = TempDir::new().unwrap();
        let store = FilesystemBlobStore::new(dir.path().join("uploaded_jds"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_new_creates_directory() {
        let (dir, _store) = store().await;
        assert!(dir.path().join("uploaded_jds").is_dir());
    }

    #[tokio::test]
    async fn test_put_then_get_returns_same_bytes() {
        let (dir, store) = store().await;
        let name = store.put("spec.pdf", b"%PDF-1.4 body").await.unwrap();

        assert!(name.ends_with("_spec.pdf"));
        assert!(dir.path().join("uploaded_jds").join(&name).is_file());
        assert_eq!(store.get(&name).await.unwrap(), b"%PDF-1.4 body");
    }

    #[tokio::test]
    async fn test_same_original_name_does_not_collide() {
        let (_dir, store) = store().await;
        let a = store.put("spec.pdf", b"first").await.unwrap();
        let b = store.put("spec.pdf", b"second").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(store.get(&a).await.unwrap(), b"first");
        assert_eq!(store.get(&b).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_put_recreates_removed_directory() {
        let (dir, store) = store().await;
        std::fs::remove_dir_all(dir.path().join("uploaded_jds")).unwrap();

        let name = store.put("notes.txt", b"hello").await.unwrap();
        assert_eq!(store.get(&name).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (_dir, store) = store().await;
        let err = store.get("deadbeef_spec.pdf").await.unwrap_err();
        assert!(matches!(err, BlobError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_traversal_names_are_rejected() {
        let (dir, store) = store().await;
        std::fs::write(dir.path().join("jobs.csv"), "secret").unwrap();

        let err = store.get("../jobs.csv").await.unwrap_err();
        assert!(matches!(err, BlobError::InvalidName { .. }));
        let err = store.delete("../jobs.csv").await.unwrap_err();
        assert!(matches!(err, BlobError::InvalidName { .. }));
        assert!(dir.path().join("jobs.csv").exists());
    }

    #[tokio::test]
    async fn test_delete_then_exists() {
        let (_dir, store) = store().await;
        let name = store.put("notes.txt", b"hello").await.unwrap();
        assert!(store.exists(&name).await.unwrap());

        store.delete(&name).await.unwrap();
        assert!(!store.exists(&name).await.unwrap());

        let err = store.delete(&name).await.unwrap_err();
        assert!(matches!(err, BlobError::NotFound(_)));
    }
}
