pub mod deps;
pub mod history;
pub mod notify;
pub mod watcher;

pub use deps::{App, AppDeps};
pub use history::HistoryService;
pub use notify::BroadcastNotifier;
pub use watcher::ClipboardWatcher;
