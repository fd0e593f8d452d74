use async_trait::async_trait;

/// The OS clipboard device.
///
/// Polled, not event-driven: the underlying platforms have no reliable
/// clipboard-change notification. The watcher is the sole in-process
/// reader; writes happen only when the user restores an entry from
/// history.
#[async_trait]
pub trait ClipboardPort: Send + Sync {
    /// Current clipboard text, `None` when no text is present.
    async fn read_text(&self) -> anyhow::Result<Option<String>>;

    /// Current clipboard image as PNG-encoded bytes, `None` when no
    /// image is present.
    async fn read_image(&self) -> anyhow::Result<Option<Vec<u8>>>;

    async fn write_text(&self, text: String) -> anyhow::Result<()>;

    async fn write_image(&self, png_bytes: Vec<u8>) -> anyhow::Result<()>;
}
