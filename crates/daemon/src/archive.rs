//! Temporary copies of submitted archives.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// Owns the temporary archive directory. Each persisted file belongs to one
/// session or one direct call and is discarded by it exactly once.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` to a fresh file under the root.
    pub async fn persist(&self, bytes: &[u8]) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(format!("{}.zip", Uuid::new_v4()));
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "archive persisted");
        Ok(path)
    }

    pub async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    /// Best-effort delete. Failures are logged, never returned.
    pub async fn discard(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "archive discarded"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to delete archive"),
        }
    }

    /// Removes whatever a previous run left behind. Returns the number of
    /// entries deleted.
    pub async fn purge(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "cannot list temp dir");
                return 0;
            }
        };

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "temp dir listing interrupted");
                    break;
                }
            };
            let path = entry.path();
            let res = match entry.file_type().await {
                Ok(ft) if ft.is_dir() => tokio::fs::remove_dir_all(&path).await,
                _ => tokio::fs::remove_file(&path).await,
            };
            match res {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "failed to purge"),
            }
        }
        removed
    }
}
