use std::sync::Arc;

use async_trait::async_trait;

use super::SnapshotProgressPort;

/// Backup/restore of the on-disk roots.
///
/// Boolean returns, not `Result`: a failed operation is reported via
/// the progress sink and logged by the implementation; callers only
/// branch on success.
#[async_trait]
pub trait SnapshotPort: Send + Sync {
    fn set_progress_sink(&self, sink: Arc<dyn SnapshotProgressPort>);

    async fn has_backup(&self) -> bool;
    async fn create_backup(&self) -> bool;
    async fn restore_backup(&self) -> bool;
    async fn delete_backup(&self) -> bool;
    async fn clean_backup_files(&self) -> bool;
}
