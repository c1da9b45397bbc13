use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

use crate::common::SessionError;

/// Storage collaborator for audio blobs.
///
/// Blobs are read concurrently by any number of HTTP range requests and
/// deleted exactly once, by garbage collection, after the owning session
/// is destroyed.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persists a blob and returns its opaque storage reference.
    async fn store(&self, bytes: Bytes, ext: &str) -> Result<String, SessionError>;

    /// Public path under which a stored blob is served.
    fn url(&self, storage_ref: &str) -> String;

    async fn delete(&self, storage_ref: &str) -> Result<(), SessionError>;
}

/// Blobs on local disk, served statically out of `dir`.
pub struct LocalFileStore {
    dir: PathBuf,
    public_prefix: String,
}

impl LocalFileStore {
    pub fn new(dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: public_prefix.into(),
        }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, bytes: Bytes, ext: &str) -> Result<String, SessionError> {
        let name = if ext.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            format!("{}.{}", uuid::Uuid::new_v4(), ext)
        };
        let path = self.dir.join(&name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| SessionError::AcquisitionFailed(format!("store failed: {e}")))?;
        Ok(name)
    }

    fn url(&self, storage_ref: &str) -> String {
        format!("{}/{}", self.public_prefix, storage_ref)
    }

    async fn delete(&self, storage_ref: &str) -> Result<(), SessionError> {
        let path = self.dir.join(storage_ref);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::AcquisitionFailed(format!(
                "delete failed: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_prefix_and_ref() {
        let store = LocalFileStore::new("songs", "/songs");
        assert_eq!(store.url("abc.mp3"), "/songs/abc.mp3");
    }

    #[tokio::test]
    async fn test_store_and_delete_roundtrip() {
        let dir = std::env::temp_dir().join(format!("tunelink-test-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let store = LocalFileStore::new(&dir, "/songs");

        let storage_ref = store
            .store(Bytes::from_static(b"audio bytes"), "mp3")
            .await
            .unwrap();
        assert!(storage_ref.ends_with(".mp3"));
        assert!(dir.join(&storage_ref).exists());

        store.delete(&storage_ref).await.unwrap();
        assert!(!dir.join(&storage_ref).exists());
        // deleting a missing blob is not an error
        store.delete(&storage_ref).await.unwrap();

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
