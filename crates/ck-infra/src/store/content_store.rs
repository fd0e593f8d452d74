use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use diesel::dsl::{count_star, sql};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel::sql_types::{BigInt, Nullable};
use log::{info, warn};

use ck_core::clipboard::{
    ClipEntry, ClipKind, EntryFilter, EntryPage, NewClipItem, RetentionPolicy, StoreStats, Tag,
    TagSelector,
};
use ck_core::ports::{ClockPort, ContentStorePort};
use ck_core::StoreError;

use crate::db::models::{ClipEntryRow, ItemTagRow, NewClipEntryRow, NewTagRow, TagRow};
use crate::db::schema::{clip_entries, item_tags, tags};
use crate::db::DbExecutor;

/// Durable record of clip entries, tags and bindings on SQLite.
///
/// All identity/dedup/ordering/retention logic lives here. The store
/// also owns the lifecycle of image blob files: deleting an image row
/// best-effort-deletes its backing file, and `clear_all` recreates the
/// temp blob directory so the watcher can keep writing into it.
pub struct ContentStore<E> {
    executor: E,
    temp_dir: PathBuf,
    clock: Arc<dyn ClockPort>,
}

/// Ordering key shared by every listing query: pinned entries sort by
/// `pinned_at`, the rest by `captured_at`.
fn sort_ts() -> diesel::expression::SqlLiteral<BigInt> {
    sql::<BigInt>("CASE WHEN pinned THEN COALESCE(pinned_at, captured_at) ELSE captured_at END")
}

fn map_db_err(err: anyhow::Error) -> StoreError {
    if let Some(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) =
        err.downcast_ref::<diesel::result::Error>()
    {
        return StoreError::Conflict(info.message().to_string());
    }
    StoreError::Storage(format!("{err:#}"))
}

impl<E: DbExecutor> ContentStore<E> {
    pub fn new(executor: E, temp_dir: impl Into<PathBuf>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            executor,
            temp_dir: temp_dir.into(),
            clock,
        }
    }

    pub fn temp_dir(&self) -> &PathBuf {
        &self.temp_dir
    }

    /// Best-effort blob removal. A missing or locked file must never
    /// abort the row deletion that triggered it.
    async fn remove_blob(&self, path: &str) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to delete image blob {}: {}", path, e),
        }
    }

    fn load_tags_for_ids(
        conn: &mut SqliteConnection,
        ids: &[i64],
    ) -> anyhow::Result<BTreeMap<i64, Vec<Tag>>> {
        let rows: Vec<(i64, TagRow)> = item_tags::table
            .inner_join(tags::table)
            .filter(item_tags::item_id.eq_any(ids))
            .order(tags::name.asc())
            .select((item_tags::item_id, TagRow::as_select()))
            .load(conn)?;

        let mut by_item: BTreeMap<i64, Vec<Tag>> = BTreeMap::new();
        for (item_id, tag_row) in rows {
            by_item.entry(item_id).or_default().push(tag_row.into());
        }
        Ok(by_item)
    }

    fn resolve_tag_id(conn: &mut SqliteConnection, tag: &TagSelector) -> anyhow::Result<Option<i64>> {
        let found = match tag {
            TagSelector::Id(id) => tags::table
                .find(id)
                .select(tags::id)
                .first::<i64>(conn)
                .optional()?,
            TagSelector::Name(name) => tags::table
                .filter(tags::name.eq(name))
                .select(tags::id)
                .first::<i64>(conn)
                .optional()?,
        };
        Ok(found)
    }

    /// Rows the retention sweep should evict, oldest first. Bounded to
    /// rows captured strictly before `sweep_start` so an insert racing
    /// the sweep is never picked up.
    fn retention_victims(
        conn: &mut SqliteConnection,
        policy: &RetentionPolicy,
        sweep_start: i64,
    ) -> anyhow::Result<Vec<i64>> {
        let mut victims: BTreeSet<i64> = BTreeSet::new();

        if let Some(max_items) = policy.max_items {
            // Pinned entries do not consume the count budget, so the
            // most-recent `max_items` unpinned entries always survive
            // no matter how many entries are pinned.
            let unpinned: i64 = clip_entries::table
                .filter(clip_entries::pinned.eq(false))
                .select(count_star())
                .first(conn)
                .context("count entries for retention")?;
            let excess = unpinned - max_items as i64;
            if excess > 0 {
                let ids: Vec<i64> = clip_entries::table
                    .filter(clip_entries::pinned.eq(false))
                    .filter(clip_entries::captured_at.lt(sweep_start))
                    .order(clip_entries::captured_at.asc())
                    .limit(excess)
                    .select(clip_entries::id)
                    .load(conn)?;
                victims.extend(ids);
            }
        }

        if let Some(days) = policy.max_age_days {
            let cutoff = sweep_start - days as i64 * 24 * 60 * 60 * 1000;
            let ids: Vec<i64> = clip_entries::table
                .filter(clip_entries::pinned.eq(false))
                .filter(clip_entries::captured_at.lt(cutoff))
                .select(clip_entries::id)
                .load(conn)?;
            victims.extend(ids);
        }

        if let Some(budget) = policy.max_total_bytes {
            // SUM over BigInt widens to Numeric in diesel's dsl, which
            // SQLite cannot hand back as i64; spell the aggregate out.
            let total_bytes: Option<i64> = clip_entries::table
                .filter(clip_entries::kind.eq(ClipKind::Image.as_str()))
                .select(sql::<Nullable<BigInt>>("SUM(size_bytes)"))
                .first(conn)
                .context("sum blob sizes for retention")?;
            let mut remaining = total_bytes.unwrap_or(0);

            if remaining > budget as i64 {
                // Bytes already freed by the count/age rules count
                // toward the budget before more images are picked.
                let candidates: Vec<(i64, Option<i64>)> = clip_entries::table
                    .filter(clip_entries::kind.eq(ClipKind::Image.as_str()))
                    .filter(clip_entries::pinned.eq(false))
                    .filter(clip_entries::captured_at.lt(sweep_start))
                    .order(clip_entries::captured_at.asc())
                    .select((clip_entries::id, clip_entries::size_bytes))
                    .load(conn)?;

                for (id, size) in &candidates {
                    if victims.contains(id) {
                        remaining -= size.unwrap_or(0);
                    }
                }
                for (id, size) in candidates {
                    if remaining <= budget as i64 {
                        break;
                    }
                    if victims.insert(id) {
                        remaining -= size.unwrap_or(0);
                    }
                }
            }
        }

        Ok(victims.into_iter().collect())
    }
}

#[async_trait]
impl<E: DbExecutor + 'static> ContentStorePort for ContentStore<E> {
    async fn add_item(&self, item: NewClipItem) -> Result<i64, StoreError> {
        if item.kind == ClipKind::Text && item.content.is_empty() {
            return Err(StoreError::InvalidInput(
                "text entry content must be non-empty".into(),
            ));
        }
        if item.kind == ClipKind::Image && item.file_path.is_none() {
            return Err(StoreError::InvalidInput(
                "image entry requires a backing file path".into(),
            ));
        }

        let now = self.clock.now_ms();
        self.executor
            .run(|conn| {
                conn.transaction(|conn| {
                    // Identity key: (kind, content) for text and
                    // (kind, file_path) for images. The watcher has
                    // already canonicalized image bytes to one path.
                    let existing: Option<ClipEntryRow> = match item.kind {
                        ClipKind::Text => clip_entries::table
                            .filter(clip_entries::kind.eq(item.kind.as_str()))
                            .filter(clip_entries::content.eq(&item.content))
                            .select(ClipEntryRow::as_select())
                            .first(conn)
                            .optional()?,
                        ClipKind::Image => clip_entries::table
                            .filter(clip_entries::kind.eq(item.kind.as_str()))
                            .filter(clip_entries::file_path.eq(item.file_path.as_deref()))
                            .select(ClipEntryRow::as_select())
                            .first(conn)
                            .optional()?,
                    };

                    // Re-capture keeps the first capture's timestamp.
                    let captured_at = existing.as_ref().map(|row| row.captured_at).unwrap_or(now);

                    if let Some(row) = &existing {
                        diesel::delete(clip_entries::table.find(row.id)).execute(conn)?;
                    }

                    let new_row = NewClipEntryRow {
                        content: &item.content,
                        kind: item.kind.as_str(),
                        file_path: item.file_path.as_deref(),
                        size_bytes: item.size_bytes,
                        captured_at,
                        pinned: false,
                        pinned_at: None,
                    };

                    let id = diesel::insert_into(clip_entries::table)
                        .values(&new_row)
                        .returning(clip_entries::id)
                        .get_result(conn)?;

                    Ok(id)
                })
            })
            .map_err(map_db_err)
    }

    async fn get_all(&self) -> Result<Vec<ClipEntry>, StoreError> {
        let rows = self
            .executor
            .run(|conn| {
                let rows: Vec<ClipEntryRow> = clip_entries::table
                    .order((
                        clip_entries::pinned.desc(),
                        sort_ts().desc(),
                        clip_entries::id.asc(),
                    ))
                    .select(ClipEntryRow::as_select())
                    .load(conn)?;
                Ok(rows)
            })
            .map_err(map_db_err)?;

        rows.into_iter().map(ClipEntryRow::into_domain).collect()
    }

    async fn search_paged(
        &self,
        filter: EntryFilter,
        page: usize,
        page_size: usize,
    ) -> Result<EntryPage, StoreError> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let offset = EntryPage::offset(page, page_size);
        let like = filter.text.as_ref().map(|t| format!("%{t}%"));

        let (total, rows, mut tags_by_item) = self
            .executor
            .run(|conn| {
                let (total, rows): (i64, Vec<ClipEntryRow>) = match filter.tag_id {
                    Some(tag_id) => {
                        let mut count_q = clip_entries::table
                            .inner_join(item_tags::table)
                            .filter(item_tags::tag_id.eq(tag_id))
                            .select(count_star())
                            .into_boxed();
                        let mut page_q = clip_entries::table
                            .inner_join(item_tags::table)
                            .filter(item_tags::tag_id.eq(tag_id))
                            .select(ClipEntryRow::as_select())
                            .into_boxed();
                        if let Some(pattern) = &like {
                            count_q = count_q.filter(clip_entries::content.like(pattern.clone()));
                            page_q = page_q.filter(clip_entries::content.like(pattern.clone()));
                        }
                        let total = count_q.first(conn)?;
                        let rows = page_q
                            .order((
                                clip_entries::pinned.desc(),
                                sort_ts().desc(),
                                clip_entries::id.asc(),
                            ))
                            .limit(page_size as i64)
                            .offset(offset as i64)
                            .load(conn)?;
                        (total, rows)
                    }
                    None => {
                        let mut count_q =
                            clip_entries::table.select(count_star()).into_boxed();
                        let mut page_q = clip_entries::table
                            .select(ClipEntryRow::as_select())
                            .into_boxed();
                        if let Some(pattern) = &like {
                            count_q = count_q.filter(clip_entries::content.like(pattern.clone()));
                            page_q = page_q.filter(clip_entries::content.like(pattern.clone()));
                        }
                        let total = count_q.first(conn)?;
                        let rows = page_q
                            .order((
                                clip_entries::pinned.desc(),
                                sort_ts().desc(),
                                clip_entries::id.asc(),
                            ))
                            .limit(page_size as i64)
                            .offset(offset as i64)
                            .load(conn)?;
                        (total, rows)
                    }
                };

                let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
                let tags_by_item = Self::load_tags_for_ids(conn, &ids)?;
                Ok((total, rows, tags_by_item))
            })
            .map_err(map_db_err)?;

        let items = rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                let mut entry = row.into_domain()?;
                entry.tags = tags_by_item.remove(&id).unwrap_or_default();
                Ok(entry)
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(EntryPage {
            items,
            total: total as usize,
            page,
            page_size,
        })
    }

    async fn get_item_by_id(&self, id: i64) -> Result<Option<ClipEntry>, StoreError> {
        let row = self
            .executor
            .run(|conn| {
                let row: Option<ClipEntryRow> = clip_entries::table
                    .find(id)
                    .select(ClipEntryRow::as_select())
                    .first(conn)
                    .optional()?;
                Ok(row)
            })
            .map_err(map_db_err)?;

        row.map(ClipEntryRow::into_domain).transpose()
    }

    async fn delete_item(&self, id: i64) -> Result<(), StoreError> {
        let file_path = self
            .executor
            .run(|conn| {
                let row: Option<ClipEntryRow> = clip_entries::table
                    .find(id)
                    .select(ClipEntryRow::as_select())
                    .first(conn)
                    .optional()?;

                // Missing id is a silent no-op.
                if row.is_some() {
                    diesel::delete(clip_entries::table.find(id)).execute(conn)?;
                }
                Ok(row.and_then(|r| r.file_path))
            })
            .map_err(map_db_err)?;

        if let Some(path) = file_path {
            self.remove_blob(&path).await;
        }
        Ok(())
    }

    async fn toggle_top(&self, id: i64, pinned: bool) -> Result<(), StoreError> {
        let pinned_at = pinned.then(|| self.clock.now_ms());
        self.executor
            .run(|conn| {
                diesel::update(clip_entries::table.find(id))
                    .set((
                        clip_entries::pinned.eq(pinned),
                        clip_entries::pinned_at.eq(pinned_at),
                    ))
                    .execute(conn)?;
                Ok(())
            })
            .map_err(map_db_err)
    }

    async fn update_item_time(&self, id: i64, time_ms: i64) -> Result<(), StoreError> {
        self.executor
            .run(|conn| {
                diesel::update(clip_entries::table.find(id))
                    .set(clip_entries::captured_at.eq(time_ms))
                    .execute(conn)?;
                Ok(())
            })
            .map_err(map_db_err)
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        let blob_paths = self
            .executor
            .run(|conn| {
                let paths: Vec<Option<String>> = clip_entries::table
                    .filter(clip_entries::kind.eq(ClipKind::Image.as_str()))
                    .select(clip_entries::file_path)
                    .load(conn)?;
                diesel::delete(clip_entries::table).execute(conn)?;
                Ok(paths)
            })
            .map_err(map_db_err)?;

        for path in blob_paths.into_iter().flatten() {
            self.remove_blob(&path).await;
        }

        // The watcher keeps writing into the temp dir after a clear.
        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .map_err(|e| {
                StoreError::Storage(format!(
                    "recreate temp dir {}: {e}",
                    self.temp_dir.display()
                ))
            })?;
        Ok(())
    }

    async fn add_tag(&self, name: &str, color: Option<String>) -> Result<Tag, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidInput("tag name must be non-empty".into()));
        }
        let now = self.clock.now_ms();
        self.executor
            .run(|conn| {
                let row: TagRow = diesel::insert_into(tags::table)
                    .values(&NewTagRow {
                        name,
                        color: color.as_deref(),
                        created_at: now,
                    })
                    .returning(TagRow::as_returning())
                    .get_result(conn)?;
                Ok(row)
            })
            .map(Tag::from)
            .map_err(map_db_err)
    }

    async fn update_tag(
        &self,
        id: i64,
        name: &str,
        color: Option<String>,
    ) -> Result<(), StoreError> {
        let updated = self
            .executor
            .run(|conn| {
                let n = diesel::update(tags::table.find(id))
                    .set((tags::name.eq(name), tags::color.eq(color.as_deref())))
                    .execute(conn)?;
                Ok(n)
            })
            .map_err(map_db_err)?;

        if updated == 0 {
            return Err(StoreError::NotFound("tag"));
        }
        Ok(())
    }

    async fn delete_tag(&self, id: i64) -> Result<(), StoreError> {
        // Bindings go with the tag (FK cascade); entries stay.
        self.executor
            .run(|conn| {
                diesel::delete(tags::table.find(id)).execute(conn)?;
                Ok(())
            })
            .map_err(map_db_err)
    }

    async fn get_all_tags(&self) -> Result<Vec<Tag>, StoreError> {
        self.executor
            .run(|conn| {
                let rows: Vec<TagRow> = tags::table
                    .order(tags::name.asc())
                    .select(TagRow::as_select())
                    .load(conn)?;
                Ok(rows)
            })
            .map(|rows| rows.into_iter().map(Tag::from).collect())
            .map_err(map_db_err)
    }

    async fn get_tags_for_item(&self, item_id: i64) -> Result<Vec<Tag>, StoreError> {
        self.executor
            .run(|conn| {
                let mut by_item = Self::load_tags_for_ids(conn, &[item_id])?;
                Ok(by_item.remove(&item_id).unwrap_or_default())
            })
            .map_err(map_db_err)
    }

    async fn bind_item_to_tag(&self, item_id: i64, tag: TagSelector) -> Result<(), StoreError> {
        enum BindOutcome {
            Bound,
            NoTag,
            NoItem,
        }

        let outcome = self
            .executor
            .run(|conn| {
                let Some(tag_id) = Self::resolve_tag_id(conn, &tag)? else {
                    return Ok(BindOutcome::NoTag);
                };

                let item_exists = clip_entries::table
                    .find(item_id)
                    .select(clip_entries::id)
                    .first::<i64>(conn)
                    .optional()?
                    .is_some();
                if !item_exists {
                    return Ok(BindOutcome::NoItem);
                }

                // Binding an already-bound pair is a no-op.
                diesel::insert_or_ignore_into(item_tags::table)
                    .values(&ItemTagRow { item_id, tag_id })
                    .execute(conn)?;
                Ok(BindOutcome::Bound)
            })
            .map_err(map_db_err)?;

        match outcome {
            BindOutcome::Bound => Ok(()),
            BindOutcome::NoTag => Err(StoreError::NotFound("tag")),
            BindOutcome::NoItem => Err(StoreError::NotFound("item")),
        }
    }

    async fn unbind_item_from_tag(&self, item_id: i64, tag_id: i64) -> Result<(), StoreError> {
        self.executor
            .run(|conn| {
                diesel::delete(
                    item_tags::table
                        .filter(item_tags::item_id.eq(item_id))
                        .filter(item_tags::tag_id.eq(tag_id)),
                )
                .execute(conn)?;
                Ok(())
            })
            .map_err(map_db_err)
    }

    async fn enforce_retention(&self, policy: &RetentionPolicy) -> Result<usize, StoreError> {
        if policy.is_noop() {
            return Ok(0);
        }

        let sweep_start = self.clock.now_ms();
        let policy = *policy;
        let victims = self
            .executor
            .run(move |conn| Self::retention_victims(conn, &policy, sweep_start))
            .map_err(map_db_err)?;

        let evicted = victims.len();
        for id in victims {
            // Evictions go through the normal delete path so image
            // blobs are cleaned up too.
            self.delete_item(id).await?;
        }
        if evicted > 0 {
            info!("retention sweep evicted {} entries", evicted);
        }
        Ok(evicted)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        self.executor
            .run(|conn| {
                let total: i64 = clip_entries::table.select(count_star()).first(conn)?;
                let bytes: Option<i64> = clip_entries::table
                    .select(sql::<Nullable<BigInt>>("SUM(size_bytes)"))
                    .first(conn)?;
                Ok(StoreStats {
                    total_items: total as usize,
                    total_bytes: bytes.unwrap_or(0).max(0) as u64,
                })
            })
            .map_err(map_db_err)
    }
}
