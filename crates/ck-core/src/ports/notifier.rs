/// Fan-out of change notifications to UI surfaces.
///
/// A single payload-free signal: the UI re-queries on change rather
/// than receiving deltas. Implementations must never block or fail the
/// mutation that emitted the signal.
pub trait NotifierPort: Send + Sync {
    fn store_changed(&self);

    /// Whether any surface is listening. The watcher skips capture
    /// cycles while this is false so content is not consumed with
    /// nobody able to receive the update.
    fn ready(&self) -> bool {
        true
    }
}
