use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Classification of a captured clipboard snapshot.
///
/// `Image` subsumes any binary kind; the canonical bytes live in a temp
/// file referenced by `ClipEntry::file_path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipKind {
    Text,
    Image,
}

impl ClipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipKind::Text => "text",
            ClipKind::Image => "image",
        }
    }

    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "text" => Ok(ClipKind::Text),
            "image" => Ok(ClipKind::Image),
            other => Err(StoreError::Storage(format!(
                "unknown clip kind in storage: {other}"
            ))),
        }
    }
}

/// One stored clipboard capture.
///
/// `content` is the literal text for `Text` entries and a display name
/// for `Image` entries, whose bytes live at `file_path`. Re-capturing
/// byte-identical content replaces the row but preserves `captured_at`
/// from the first capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipEntry {
    pub id: i64,
    pub content: String,
    pub kind: ClipKind,
    pub file_path: Option<String>,
    /// On-disk size of the backing image blob. `None` for text.
    pub size_bytes: Option<i64>,
    /// Milliseconds since epoch of the original capture.
    pub captured_at: i64,
    pub pinned: bool,
    pub pinned_at: Option<i64>,
    /// Tags bound to this entry. Populated by paged search and the
    /// per-item tag query; empty elsewhere.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl ClipEntry {
    /// Ordering key per the store invariant: pinned entries sort by
    /// `pinned_at`, the rest by `captured_at`.
    pub fn sort_ts(&self) -> i64 {
        if self.pinned {
            self.pinned_at.unwrap_or(self.captured_at)
        } else {
            self.captured_at
        }
    }
}

/// Input for a store insert, produced by the watcher.
#[derive(Debug, Clone)]
pub struct NewClipItem {
    pub content: String,
    pub kind: ClipKind,
    pub file_path: Option<String>,
    pub size_bytes: Option<i64>,
}

impl NewClipItem {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: ClipKind::Text,
            file_path: None,
            size_bytes: None,
        }
    }

    pub fn image(display_name: impl Into<String>, path: impl Into<String>, size_bytes: i64) -> Self {
        Self {
            content: display_name.into(),
            kind: ClipKind::Image,
            file_path: Some(path.into()),
            size_bytes: Some(size_bytes),
        }
    }
}

/// User-defined label with a globally unique name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
    pub created_at: i64,
}
