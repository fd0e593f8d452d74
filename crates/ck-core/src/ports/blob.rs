use std::path::PathBuf;

use async_trait::async_trait;

/// Placement of captured image bytes on disk.
///
/// Implementations return one canonical path per distinct byte
/// content, which is what lets the store treat the file path as the
/// image identity key.
#[async_trait]
pub trait BlobStorePort: Send + Sync {
    /// Store PNG bytes, reusing an existing byte-identical blob when
    /// one is present.
    async fn store_image(&self, bytes: &[u8], now_ms: i64) -> anyhow::Result<PathBuf>;
}
