mod manager;

pub use manager::SnapshotManager;
