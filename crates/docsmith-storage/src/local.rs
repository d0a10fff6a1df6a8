use crate::reclaim::DeleteOnDrop;
use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `base_path`
    /// (e.g., "/var/lib/docsmith/data"). The directory is created if missing.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    /// Convert storage key to filesystem path with security validation.
    ///
    /// Rejects keys containing traversal sequences or absolute paths that
    /// could escape the base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains("..")
            || storage_key.starts_with('/')
            || storage_key.contains('\\')
        {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        Ok(self.base_path.join(storage_key))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn open_stream(&self, storage_key: &str) -> StorageResult<(PathBuf, ByteStream)> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let reader = tokio_util::io::ReaderStream::new(file);
        let stream = reader.map(|result| {
            result.map_err(|e| StorageError::DownloadFailed(format!("Failed to read chunk: {}", e)))
        });

        Ok((path, Box::pin(stream)))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn save(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage save successful"
        );

        Ok(())
    }

    async fn read(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        Ok(data)
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(key = %storage_key, "Local storage delete successful");

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        let path = self.key_to_path(storage_key)?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|_| StorageError::NotFound(storage_key.to_string()))?;
        Ok(meta.len())
    }

    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        let (_path, stream) = self.open_stream(storage_key).await?;
        Ok(stream)
    }

    async fn reclaim_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        let (path, stream) = self.open_stream(storage_key).await?;

        // The guard lives inside the closure; when the stream is dropped
        // (fully transmitted or connection gone) the file is removed.
        let guard = DeleteOnDrop::new(path);
        let reclaiming = stream.map(move |item| {
            let _hold = &guard;
            item
        });

        Ok(Box::pin(reclaiming))
    }

    async fn find_by_id_prefix(
        &self,
        dir: &str,
        id_prefix: &str,
    ) -> StorageResult<Option<String>> {
        let dir_path = self.key_to_path(dir)?;
        // The id must itself be key-safe before we compare filenames against it.
        if id_prefix.is_empty() || id_prefix.contains(['/', '\\', '.']) {
            return Err(StorageError::InvalidKey(
                "Identifier prefix contains invalid characters".to_string(),
            ));
        }

        let mut entries = match fs::read_dir(&dir_path).await {
            Ok(entries) => entries,
            Err(_) => return Ok(None),
        };

        let wanted = format!("{}.", id_prefix);
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(&wanted) {
                return Ok(Some(format!("{}/{}", dir.trim_end_matches('/'), name)));
            }
        }

        Ok(None)
    }

    fn fs_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        self.key_to_path(storage_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tempfile::tempdir;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_save_read_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let data = b"test data".to_vec();
        storage.save("uploads/test.pdf", data.clone()).await.unwrap();

        let read_back = storage.read("uploads/test.pdf").await.unwrap();
        assert_eq!(data, read_back);
        assert_eq!(storage.content_length("uploads/test.pdf").await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.read("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_delete_nonexistent_is_ok() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        assert!(storage.delete("jobs/nonexistent.pdf").await.is_ok());
    }

    #[tokio::test]
    async fn test_find_by_id_prefix() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let job_id = Uuid::new_v4();
        let key = format!("jobs/{}.docx", job_id);
        storage.save(&key, b"artifact".to_vec()).await.unwrap();

        let found = storage
            .find_by_id_prefix("jobs", &job_id.to_string())
            .await
            .unwrap();
        assert_eq!(found, Some(key));

        let missing = storage
            .find_by_id_prefix("jobs", &Uuid::new_v4().to_string())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_find_by_id_prefix_rejects_unsafe_identifier() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.find_by_id_prefix("jobs", "../uploads").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_download_stream() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let data = b"stream download test".to_vec();
        storage.save("jobs/a.pdf", data.clone()).await.unwrap();

        let mut stream = storage.download_stream("jobs/a.pdf").await.unwrap();
        let mut downloaded = Vec::new();
        while let Some(chunk) = stream.next().await {
            downloaded.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(data, downloaded);

        // Plain download does not reclaim
        assert!(storage.exists("jobs/a.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_reclaim_stream_deletes_after_full_read() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage.save("jobs/b.jpg", b"artifact bytes".to_vec()).await.unwrap();

        {
            let mut stream = storage.reclaim_stream("jobs/b.jpg").await.unwrap();
            while let Some(chunk) = stream.next().await {
                chunk.unwrap();
            }
        }

        assert!(!storage.exists("jobs/b.jpg").await.unwrap());
        // Second fetch finds nothing
        let result = storage.reclaim_stream("jobs/b.jpg").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reclaim_stream_deletes_on_abandoned_transfer() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage.save("jobs/c.tex", vec![0u8; 256 * 1024]).await.unwrap();

        {
            let mut stream = storage.reclaim_stream("jobs/c.tex").await.unwrap();
            // Read one chunk, then drop the stream mid-transfer
            let _ = stream.next().await;
        }

        assert!(!storage.exists("jobs/c.tex").await.unwrap());
    }
}
