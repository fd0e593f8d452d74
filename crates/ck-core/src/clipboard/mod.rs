mod entry;
mod query;

pub use entry::{ClipEntry, ClipKind, NewClipItem, Tag};
pub use query::{EntryFilter, EntryPage, RetentionPolicy, StoreStats, TagSelector};
