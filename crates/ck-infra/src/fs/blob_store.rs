use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

use ck_core::ports::BlobStorePort;

const BLOB_EXTENSION: &str = "png";

/// Temp-directory store for captured image bytes.
///
/// Blobs are content-addressed by discovery: before writing, the
/// directory is scanned for a byte-identical file and its path reused,
/// so the watcher always hands the store one canonical path per image.
/// New files are named by capture timestamp.
pub struct TempBlobStore {
    root: PathBuf,
}

impl TempBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("create temp blob dir {}", self.root.display()))
    }

    async fn place_image(&self, bytes: &[u8], now_ms: i64) -> Result<PathBuf> {
        self.ensure_root().await?;

        if let Some(existing) = self.find_identical(bytes).await? {
            return Ok(existing);
        }

        let mut path = self.root.join(format!("{now_ms}.{BLOB_EXTENSION}"));
        // Two distinct captures inside one millisecond is unlikely but
        // must not clobber the earlier blob.
        let mut suffix = 1;
        while fs::try_exists(&path).await? {
            path = self
                .root
                .join(format!("{now_ms}-{suffix}.{BLOB_EXTENSION}"));
            suffix += 1;
        }

        fs::write(&path, bytes)
            .await
            .with_context(|| format!("write image blob {}", path.display()))?;
        Ok(path)
    }

    /// Linear scan comparing bytes; O(files x bytes) per call. The size
    /// check skips almost every candidate before any bytes are read.
    async fn find_identical(&self, bytes: &[u8]) -> Result<Option<PathBuf>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("scan temp dir {}", self.root.display()))
            }
        };

        while let Some(entry) = entries.next_entry().await? {
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(_) => continue,
            };
            if !meta.is_file() || meta.len() != bytes.len() as u64 {
                continue;
            }
            match fs::read(entry.path()).await {
                Ok(candidate) if candidate == bytes => return Ok(Some(entry.path())),
                _ => continue,
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl BlobStorePort for TempBlobStore {
    async fn store_image(&self, bytes: &[u8], now_ms: i64) -> Result<PathBuf> {
        self.place_image(bytes, now_ms).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_bytes_reuse_the_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempBlobStore::new(dir.path());

        let first = store.store_image(b"png-bytes", 1000).await.unwrap();
        let second = store.store_image(b"png-bytes", 2000).await.unwrap();
        assert_eq!(first, second);

        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn distinct_bytes_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempBlobStore::new(dir.path());

        let first = store.store_image(b"aaaa", 1000).await.unwrap();
        let second = store.store_image(b"bbbb", 1000).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(std::fs::read(first).unwrap(), b"aaaa");
        assert_eq!(std::fs::read(second).unwrap(), b"bbbb");
    }

    #[tokio::test]
    async fn same_length_different_bytes_are_not_confused() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempBlobStore::new(dir.path());

        store.store_image(b"abcd", 1000).await.unwrap();
        let other = store.store_image(b"abce", 2000).await.unwrap();
        assert!(other.ends_with("2000.png"));
    }
}
