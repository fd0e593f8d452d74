use diesel::prelude::*;

use ck_core::clipboard::{ClipEntry, ClipKind, Tag};
use ck_core::StoreError;

use super::schema::{clip_entries, item_tags, tags};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = clip_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ClipEntryRow {
    pub id: i64,
    pub content: String,
    pub kind: String,
    pub file_path: Option<String>,
    pub size_bytes: Option<i64>,
    pub captured_at: i64,
    pub pinned: bool,
    pub pinned_at: Option<i64>,
}

impl ClipEntryRow {
    pub fn into_domain(self) -> Result<ClipEntry, StoreError> {
        Ok(ClipEntry {
            id: self.id,
            kind: ClipKind::parse(&self.kind)?,
            content: self.content,
            file_path: self.file_path,
            size_bytes: self.size_bytes,
            captured_at: self.captured_at,
            pinned: self.pinned,
            pinned_at: self.pinned_at,
            tags: Vec::new(),
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = clip_entries)]
pub struct NewClipEntryRow<'a> {
    pub content: &'a str,
    pub kind: &'a str,
    pub file_path: Option<&'a str>,
    pub size_bytes: Option<i64>,
    pub captured_at: i64,
    pub pinned: bool,
    pub pinned_at: Option<i64>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = tags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TagRow {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
    pub created_at: i64,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            color: row.color,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tags)]
pub struct NewTagRow<'a> {
    pub name: &'a str,
    pub color: Option<&'a str>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = item_tags)]
pub struct ItemTagRow {
    pub item_id: i64,
    pub tag_id: i64,
}
