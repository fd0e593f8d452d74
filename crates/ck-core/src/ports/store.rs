use async_trait::async_trait;

use crate::clipboard::{
    ClipEntry, EntryFilter, EntryPage, NewClipItem, RetentionPolicy, StoreStats, Tag, TagSelector,
};
use crate::error::StoreError;

/// Durable, queryable record of clip entries, tags and bindings.
///
/// Owns all identity/dedup/ordering/retention logic. The watcher is the
/// only writer of new items; the UI surface drives everything else.
#[async_trait]
pub trait ContentStorePort: Send + Sync {
    /// Insert a capture, replacing any live row with the same identity
    /// key ((kind, content) for text, (kind, file_path) for images)
    /// while preserving the original `captured_at`. Runs as a single
    /// atomic unit; on error the caller is responsible for compensating
    /// cleanup such as deleting an orphaned temp file.
    async fn add_item(&self, item: NewClipItem) -> Result<i64, StoreError>;

    /// All entries in the pin-first ordering.
    async fn get_all(&self) -> Result<Vec<ClipEntry>, StoreError>;

    /// Filtered page plus unpaged total; entries carry their tags.
    /// Ordering matches `get_all` with an id tie-break so repeated
    /// calls page deterministically over unchanged data.
    async fn search_paged(
        &self,
        filter: EntryFilter,
        page: usize,
        page_size: usize,
    ) -> Result<EntryPage, StoreError>;

    async fn get_item_by_id(&self, id: i64) -> Result<Option<ClipEntry>, StoreError>;

    /// Delete a row; missing ids are a silent no-op. Image entries get
    /// a best-effort delete of the backing file.
    async fn delete_item(&self, id: i64) -> Result<(), StoreError>;

    /// Pin or unpin. Pinning stamps `pinned_at` with the current time;
    /// unpinning clears it.
    async fn toggle_top(&self, id: i64, pinned: bool) -> Result<(), StoreError>;

    /// Bump recency when the user re-copies an entry, without
    /// re-inserting it.
    async fn update_item_time(&self, id: i64, time_ms: i64) -> Result<(), StoreError>;

    /// Delete every entry, best-effort-delete image blobs, then ensure
    /// the temp blob directory exists again for the watcher.
    async fn clear_all(&self) -> Result<(), StoreError>;

    async fn add_tag(&self, name: &str, color: Option<String>) -> Result<Tag, StoreError>;

    async fn update_tag(
        &self,
        id: i64,
        name: &str,
        color: Option<String>,
    ) -> Result<(), StoreError>;

    /// Remove the tag and its bindings; bound entries stay.
    async fn delete_tag(&self, id: i64) -> Result<(), StoreError>;

    async fn get_all_tags(&self) -> Result<Vec<Tag>, StoreError>;

    async fn get_tags_for_item(&self, item_id: i64) -> Result<Vec<Tag>, StoreError>;

    /// Idempotent: binding an already-bound pair is a no-op. Binding to
    /// a missing tag or item is `NotFound`.
    async fn bind_item_to_tag(&self, item_id: i64, tag: TagSelector) -> Result<(), StoreError>;

    async fn unbind_item_from_tag(&self, item_id: i64, tag_id: i64) -> Result<(), StoreError>;

    /// Maintenance sweep evicting entries beyond the count/age/size
    /// budgets. Pinned entries are exempt and do not consume the
    /// count budget; only rows captured strictly
    /// before the sweep's start time are eligible, so an insert racing
    /// the sweep is never evicted. Returns the number of evictions.
    async fn enforce_retention(&self, policy: &RetentionPolicy) -> Result<usize, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;
}
