//! Storage setup.

use std::sync::Arc;

use anyhow::{Context, Result};

use docsmith_core::Config;
use docsmith_storage::{LocalStorage, Storage};

/// Initialize local storage under the configured root, pre-creating the
/// upload and artifact subtrees.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage = LocalStorage::new(config.storage_root.clone())
        .await
        .context("Failed to initialize storage root")?;

    for prefix in [config.upload_prefix(), config.output_prefix()] {
        let dir = storage
            .fs_path(prefix)
            .with_context(|| format!("Invalid storage prefix '{prefix}'"))?;
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create storage dir {}", dir.display()))?;
    }

    tracing::info!(root = %config.storage_root, "Local storage initialized");
    Ok(Arc::new(storage))
}
