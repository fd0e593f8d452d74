use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::warn;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use ck_core::clipboard::{NewClipItem, RetentionPolicy};
use ck_core::ports::{BlobStorePort, ClipboardPort, ClockPort, ContentStorePort, NotifierPort};
use ck_core::settings::Settings;

/// Last-seen image bytes.
///
/// `Unseen` and `Absent` are distinct from any observed buffer so the
/// first image ever seen is still treated as new content.
#[derive(Debug, Clone, PartialEq)]
enum ImageBaseline {
    Unseen,
    Absent,
    Seen(Vec<u8>),
}

/// Polls the OS clipboard and turns new content into store writes.
///
/// One self-resubmitting loop: each cycle reads image then text,
/// compares against the last-seen baselines, stores what changed, and
/// reschedules after a fixed delay. A failing cycle is logged and never
/// stops the loop.
pub struct ClipboardWatcher {
    clipboard: Arc<dyn ClipboardPort>,
    store: Arc<dyn ContentStorePort>,
    blobs: Arc<dyn BlobStorePort>,
    notifier: Arc<dyn NotifierPort>,
    clock: Arc<dyn ClockPort>,
    poll_interval: Duration,
    max_item_bytes: u64,
    retention: RetentionPolicy,
    last_text: Mutex<Option<String>>,
    last_image: Mutex<ImageBaseline>,
    stopped: AtomicBool,
}

impl ClipboardWatcher {
    pub fn new(
        clipboard: Arc<dyn ClipboardPort>,
        store: Arc<dyn ContentStorePort>,
        blobs: Arc<dyn BlobStorePort>,
        notifier: Arc<dyn NotifierPort>,
        clock: Arc<dyn ClockPort>,
        settings: &Settings,
    ) -> Self {
        Self {
            clipboard,
            store,
            blobs,
            notifier,
            clock,
            poll_interval: Duration::from_millis(settings.capture.poll_interval_ms),
            max_item_bytes: settings.max_item_size_bytes(),
            retention: settings.retention_policy(),
            last_text: Mutex::new(None),
            last_image: Mutex::new(ImageBaseline::Unseen),
            stopped: AtomicBool::new(false),
        }
    }

    /// Spawn the polling loop. Restartable after `stop`.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        self.stopped.store(false, Ordering::SeqCst);
        let watcher = Arc::clone(self);
        tokio::spawn(async move { watcher.run().await })
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    async fn run(&self) {
        while !self.stopped.load(Ordering::SeqCst) {
            if let Err(e) = self.check_once().await {
                warn!("clipboard poll cycle failed: {e:#}");
            }
            // Reschedule unconditionally; a slow cycle delays the next
            // one rather than overlapping it.
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One poll cycle. Image is checked before text so an entry that
    /// carries both formats lands as the richer kind.
    pub async fn check_once(&self) -> Result<()> {
        // Nothing can receive the update; leave all state untouched so
        // the content is picked up once a surface attaches.
        if !self.notifier.ready() {
            return Ok(());
        }

        let mut captured = false;

        match self.clipboard.read_image().await? {
            Some(bytes) => captured |= self.handle_image(bytes).await?,
            None => *self.last_image.lock().await = ImageBaseline::Absent,
        }

        if let Some(text) = self.clipboard.read_text().await? {
            if !text.is_empty() {
                captured |= self.handle_text(text).await?;
            }
        }

        if captured {
            self.notifier.store_changed();
            let evicted = self.store.enforce_retention(&self.retention).await?;
            if evicted > 0 {
                self.notifier.store_changed();
            }
        }
        Ok(())
    }

    async fn handle_image(&self, bytes: Vec<u8>) -> Result<bool> {
        let mut last = self.last_image.lock().await;
        if matches!(&*last, ImageBaseline::Seen(seen) if *seen == bytes) {
            return Ok(false);
        }

        if bytes.len() as u64 > self.max_item_bytes {
            // The baseline still advances so the same oversized image
            // is logged once, not on every poll.
            warn!(
                "dropping oversized clipboard image ({} bytes, limit {})",
                bytes.len(),
                self.max_item_bytes
            );
            *last = ImageBaseline::Seen(bytes);
            return Ok(false);
        }

        let now = self.clock.now_ms();
        let path = self.blobs.store_image(&bytes, now).await?;
        let display = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image.png")
            .to_string();
        let size = bytes.len() as i64;
        self.store
            .add_item(NewClipItem::image(
                display,
                path.to_string_lossy().into_owned(),
                size,
            ))
            .await?;
        *last = ImageBaseline::Seen(bytes);
        Ok(true)
    }

    async fn handle_text(&self, text: String) -> Result<bool> {
        let mut last = self.last_text.lock().await;
        if last.as_deref() == Some(text.as_str()) {
            return Ok(false);
        }

        if text.len() as u64 > self.max_item_bytes {
            warn!(
                "dropping oversized clipboard text ({} bytes, limit {})",
                text.len(),
                self.max_item_bytes
            );
            *last = Some(text);
            return Ok(false);
        }

        self.store.add_item(NewClipItem::text(text.clone())).await?;
        *last = Some(text);
        Ok(true)
    }

    /// Advance the text baseline before the app writes history content
    /// back to the OS clipboard, so the next poll does not re-ingest
    /// our own write.
    pub async fn note_self_copy_text(&self, text: String) {
        *self.last_text.lock().await = Some(text);
    }

    pub async fn note_self_copy_image(&self, bytes: Vec<u8>) {
        *self.last_image.lock().await = ImageBaseline::Seen(bytes);
    }
}
