//! Storage abstraction trait
//!
//! Defines the Storage trait the API and conversion pipeline work against,
//! so repositories and handlers never couple to filesystem details.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Streamed file body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage abstraction trait
///
/// **Key format:** relative keys under the storage root, e.g.
/// `uploads/{document_id}_{sanitized_name}` or `jobs/{job_id}.{ext}`.
/// Implementations must reject keys that resolve outside their root.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write bytes to the given storage key, creating parent directories.
    async fn save(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Read a whole file by its storage key.
    async fn read(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a file by its storage key. Deleting a missing file is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Whether a file exists at the given storage key.
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Size in bytes of the stored file.
    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;

    /// Stream a file's bytes.
    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream>;

    /// Stream a file's bytes and remove the file once the stream is dropped,
    /// whether or not transmission completed. Used to reclaim served artifacts.
    async fn reclaim_stream(&self, storage_key: &str) -> StorageResult<ByteStream>;

    /// Find the single key under `dir` whose filename starts with `{id_prefix}.`.
    /// Identifiers are UUIDs followed by a `.` separator, so a prefix match
    /// cannot collide with a different identifier.
    async fn find_by_id_prefix(&self, dir: &str, id_prefix: &str)
        -> StorageResult<Option<String>>;

    /// Absolute filesystem path for a key, for handing to external tools.
    fn fs_path(&self, storage_key: &str) -> StorageResult<PathBuf>;
}
