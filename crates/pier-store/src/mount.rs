//! Mounts: how a shard key resolves to a byte source.
//!
//! A mount describes where a shard's bytes live (a local file, a sealed
//! sector, a remote endpoint) and can produce a reader over them on
//! demand. Indexing reads synchronously, so `fetch` hands back a blocking
//! reader that engines drive from a blocking thread.

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pier_types::PieceCommitment;
use tracing::debug;

use crate::error::StoreError;

/// A readable, seekable shard byte source. Blanket-implemented.
pub trait MountReader: Read + Seek + Send {}

impl<T: Read + Seek + Send> MountReader for T {}

/// Metadata about a mount's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountStat {
    /// Total size of the shard's byte stream.
    pub size: u64,
}

/// Resolves a shard's bytes, potentially fetching them from a remote
/// source.
#[async_trait::async_trait]
pub trait Mount: Send + Sync {
    /// Describe the target without fetching it.
    async fn stat(&self) -> Result<MountStat, StoreError>;

    /// Produce a fresh reader over the full shard byte stream.
    async fn fetch(&self) -> Result<Box<dyn MountReader>, StoreError>;
}

/// Builds the node-specific [`Mount`] for a piece commitment.
///
/// This is the seam where a node plugs in its retrieval scheme; the
/// lifecycle manager calls it once per registration.
pub trait MountFactory: Send + Sync {
    /// Build the mount that serves the given piece.
    fn mount_for(&self, commitment: &PieceCommitment) -> Result<Arc<dyn Mount>, StoreError>;
}

/// A mount over a local archive file.
pub struct FileMount {
    path: PathBuf,
}

impl FileMount {
    /// Create a mount for the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl Mount for FileMount {
    async fn stat(&self) -> Result<MountStat, StoreError> {
        let meta = tokio::fs::metadata(&self.path).await?;
        Ok(MountStat { size: meta.len() })
    }

    async fn fetch(&self) -> Result<Box<dyn MountReader>, StoreError> {
        let file = tokio::fs::File::open(&self.path).await?;
        debug!(path = %self.path.display(), "opened file mount");
        Ok(Box::new(file.into_std().await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::SeekFrom;

    #[tokio::test]
    async fn test_file_mount_stat_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("piece.bin");
        tokio::fs::write(&path, b"twelve bytes").await.unwrap();

        let mount = FileMount::new(&path);
        assert_eq!(mount.stat().await.unwrap(), MountStat { size: 12 });
    }

    #[tokio::test]
    async fn test_file_mount_fetch_reads_and_seeks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("piece.bin");
        tokio::fs::write(&path, b"0123456789").await.unwrap();

        let mount = FileMount::new(&path);
        let mut reader = mount.fetch().await.unwrap();

        reader.seek(SeekFrom::Start(4)).unwrap();
        let mut buf = [0u8; 3];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"456");
    }

    #[tokio::test]
    async fn test_file_mount_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mount = FileMount::new(dir.path().join("absent.bin"));

        assert!(mount.stat().await.is_err());
        assert!(mount.fetch().await.is_err());
    }
}
