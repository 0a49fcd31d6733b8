//! Completion marker read by the desktop shell in development mode

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// File name of the marker, inside the output directory
pub const SENTINEL_FILE_NAME: &str = ".build-electron-done";

/// Zero-byte file whose presence means "the preload bundle is ready"
#[derive(Debug, Clone)]
pub struct Sentinel {
    path: PathBuf,
}

impl Sentinel {
    pub fn new(out_dir: &Path) -> Self {
        Self {
            path: out_dir.join(SENTINEL_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove the marker; a missing file or any other failure is ignored
    pub async fn clear(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            debug!("Not removing {}: {}", self.path.display(), e);
        }
    }

    /// Write the (empty) marker
    pub async fn signal(&self) -> Result<()> {
        tokio::fs::write(&self.path, b"")
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let sentinel = Sentinel::new(dir.path());

        sentinel.signal().await.unwrap();

        assert_eq!(sentinel.path(), dir.path().join(".build-electron-done"));
        assert_eq!(std::fs::metadata(sentinel.path()).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_clear_is_quiet_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let sentinel = Sentinel::new(dir.path());

        sentinel.clear().await;
        assert!(!sentinel.exists());

        sentinel.signal().await.unwrap();
        sentinel.clear().await;
        assert!(!sentinel.exists());
    }
}
