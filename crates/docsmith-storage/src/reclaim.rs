//! Delete-on-drop guard for served artifacts.
//!
//! A completed job's artifact is removed once its download response stream
//! is dropped. Dropping happens whether the body was fully transmitted or
//! the connection died midway, so reclamation cannot leak files.

use std::path::PathBuf;

/// Removes the wrapped file when dropped.
#[derive(Debug)]
pub struct DeleteOnDrop {
    path: PathBuf,
}

impl DeleteOnDrop {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Drop for DeleteOnDrop {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Reclaimed artifact");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to reclaim artifact"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_removes_file_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("artifact.pdf");
        std::fs::write(&path, b"bytes").unwrap();

        {
            let _guard = DeleteOnDrop::new(&path);
            assert!(path.exists());
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_is_silent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("never-written.pdf");
        // Must not panic
        drop(DeleteOnDrop::new(&path));
    }
}
