use std::sync::Arc;

use tracing::{info, info_span, Instrument};

use ck_core::clipboard::{ClipEntry, ClipKind, EntryFilter, EntryPage, StoreStats, Tag, TagSelector};
use ck_core::ports::{ClipboardPort, ClockPort, ContentStorePort, NotifierPort};
use ck_core::StoreError;

use crate::watcher::ClipboardWatcher;

/// Query and mutation surface over the content store.
///
/// Every mutation emits the store-changed signal; queries pass through.
/// `recopy_entry` is the one path that writes back to the OS clipboard,
/// and it marks the watcher baseline first so the write is not
/// re-ingested on the next poll.
pub struct HistoryService {
    store: Arc<dyn ContentStorePort>,
    clipboard: Arc<dyn ClipboardPort>,
    notifier: Arc<dyn NotifierPort>,
    clock: Arc<dyn ClockPort>,
    watcher: Arc<ClipboardWatcher>,
}

impl HistoryService {
    pub fn new(
        store: Arc<dyn ContentStorePort>,
        clipboard: Arc<dyn ClipboardPort>,
        notifier: Arc<dyn NotifierPort>,
        clock: Arc<dyn ClockPort>,
        watcher: Arc<ClipboardWatcher>,
    ) -> Self {
        Self {
            store,
            clipboard,
            notifier,
            clock,
            watcher,
        }
    }

    pub async fn list_all(&self) -> Result<Vec<ClipEntry>, StoreError> {
        self.store.get_all().await
    }

    pub async fn search_paged(
        &self,
        filter: EntryFilter,
        page: usize,
        page_size: usize,
    ) -> Result<EntryPage, StoreError> {
        self.store.search_paged(filter, page, page_size).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ClipEntry>, StoreError> {
        self.store.get_item_by_id(id).await
    }

    pub async fn get_all_tags(&self) -> Result<Vec<Tag>, StoreError> {
        self.store.get_all_tags().await
    }

    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        self.store.stats().await
    }

    pub async fn get_tags_for_item(&self, item_id: i64) -> Result<Vec<Tag>, StoreError> {
        self.store.get_tags_for_item(item_id).await
    }

    pub async fn delete_item(&self, id: i64) -> Result<(), StoreError> {
        self.store.delete_item(id).await?;
        self.notifier.store_changed();
        Ok(())
    }

    pub async fn toggle_pin(&self, id: i64, pinned: bool) -> Result<(), StoreError> {
        self.store.toggle_top(id, pinned).await?;
        self.notifier.store_changed();
        Ok(())
    }

    pub async fn clear_all(&self) -> Result<(), StoreError> {
        self.store.clear_all().await?;
        self.notifier.store_changed();
        Ok(())
    }

    pub async fn add_tag(&self, name: &str, color: Option<String>) -> Result<Tag, StoreError> {
        let tag = self.store.add_tag(name, color).await?;
        self.notifier.store_changed();
        Ok(tag)
    }

    pub async fn update_tag(
        &self,
        id: i64,
        name: &str,
        color: Option<String>,
    ) -> Result<(), StoreError> {
        self.store.update_tag(id, name, color).await?;
        self.notifier.store_changed();
        Ok(())
    }

    pub async fn delete_tag(&self, id: i64) -> Result<(), StoreError> {
        self.store.delete_tag(id).await?;
        self.notifier.store_changed();
        Ok(())
    }

    pub async fn bind_tag(&self, item_id: i64, tag: TagSelector) -> Result<(), StoreError> {
        self.store.bind_item_to_tag(item_id, tag).await?;
        self.notifier.store_changed();
        Ok(())
    }

    pub async fn unbind_tag(&self, item_id: i64, tag_id: i64) -> Result<(), StoreError> {
        self.store.unbind_item_from_tag(item_id, tag_id).await?;
        self.notifier.store_changed();
        Ok(())
    }

    /// Write a history entry back to the OS clipboard and bump its
    /// recency without re-inserting it.
    pub async fn recopy_entry(&self, id: i64) -> Result<(), StoreError> {
        let span = info_span!("history.recopy_entry", id);

        async {
            let Some(entry) = self.store.get_item_by_id(id).await? else {
                return Err(StoreError::NotFound("item"));
            };

            match entry.kind {
                ClipKind::Text => {
                    self.watcher.note_self_copy_text(entry.content.clone()).await;
                    self.clipboard
                        .write_text(entry.content)
                        .await
                        .map_err(|e| StoreError::Storage(format!("clipboard write: {e:#}")))?;
                }
                ClipKind::Image => {
                    let path = entry.file_path.ok_or_else(|| {
                        StoreError::Storage("image entry without a backing file".into())
                    })?;
                    let bytes = tokio::fs::read(&path).await.map_err(|e| {
                        StoreError::Storage(format!("read image blob {path}: {e}"))
                    })?;
                    self.watcher.note_self_copy_image(bytes.clone()).await;
                    self.clipboard
                        .write_image(bytes)
                        .await
                        .map_err(|e| StoreError::Storage(format!("clipboard write: {e:#}")))?;
                }
            }

            self.store.update_item_time(id, self.clock.now_ms()).await?;
            self.notifier.store_changed();
            info!("entry recopied to clipboard");
            Ok(())
        }
        .instrument(span)
        .await
    }
}
