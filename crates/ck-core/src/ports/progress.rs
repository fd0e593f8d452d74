/// Push-based progress reporting for backup/restore.
///
/// One registered sink receives `(percent, status)` pairs; the update
/// flow forwards them to whatever UI surface is listening.
pub trait SnapshotProgressPort: Send + Sync {
    fn report(&self, percent: u8, status: &str);
}

/// Sink that drops all progress updates. Useful when no UI is attached.
pub struct NullProgressSink;

impl SnapshotProgressPort for NullProgressSink {
    fn report(&self, _percent: u8, _status: &str) {}
}
