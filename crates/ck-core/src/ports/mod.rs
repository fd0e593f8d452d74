mod blob;
mod clipboard;
mod clock;
mod notifier;
mod progress;
mod settings;
mod snapshot;
mod store;

pub use blob::BlobStorePort;
pub use clipboard::ClipboardPort;
pub use clock::ClockPort;
pub use notifier::NotifierPort;
pub use progress::{NullProgressSink, SnapshotProgressPort};
pub use settings::SettingsPort;
pub use snapshot::SnapshotPort;
pub use store::ContentStorePort;
