use serde::{Deserialize, Serialize};

use super::{ClipEntry, Tag};

/// Filters for paged search. Both are AND-combined when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryFilter {
    /// Substring match on entry content.
    pub text: Option<String>,
    /// Restrict to entries bound to this tag.
    pub tag_id: Option<i64>,
}

impl EntryFilter {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.tag_id.is_none()
    }
}

/// One page of search results plus the unpaged total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPage {
    pub items: Vec<ClipEntry>,
    pub total: usize,
    /// Page number, starting from 1.
    pub page: usize,
    pub page_size: usize,
}

impl EntryPage {
    pub fn offset(page: usize, page_size: usize) -> usize {
        page.saturating_sub(1) * page_size
    }
}

/// Either side of a tag lookup: by id from the list UI, by name from
/// free-form input. Binding to a name that does not exist is NotFound,
/// never an implicit create.
#[derive(Debug, Clone)]
pub enum TagSelector {
    Id(i64),
    Name(String),
}

impl From<i64> for TagSelector {
    fn from(id: i64) -> Self {
        TagSelector::Id(id)
    }
}

impl From<&Tag> for TagSelector {
    fn from(tag: &Tag) -> Self {
        TagSelector::Id(tag.id)
    }
}

/// Retention budgets for the maintenance sweep. `None` disables the
/// corresponding rule; pinned entries are exempt from every rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionPolicy {
    pub max_items: Option<usize>,
    pub max_age_days: Option<u32>,
    /// Budget for the total on-disk size of image blobs.
    pub max_total_bytes: Option<u64>,
}

impl RetentionPolicy {
    pub fn is_noop(&self) -> bool {
        self.max_items.is_none() && self.max_age_days.is_none() && self.max_total_bytes.is_none()
    }
}

/// Aggregate counters surfaced to the storage settings UI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_items: usize,
    /// Sum of image blob sizes in bytes.
    pub total_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_is_zero_based_from_page_one() {
        assert_eq!(EntryPage::offset(1, 20), 0);
        assert_eq!(EntryPage::offset(3, 20), 40);
        assert_eq!(EntryPage::offset(0, 20), 0);
    }

    #[test]
    fn empty_policy_is_noop() {
        assert!(RetentionPolicy::default().is_noop());
        let policy = RetentionPolicy {
            max_items: Some(100),
            ..Default::default()
        };
        assert!(!policy.is_noop());
    }
}
