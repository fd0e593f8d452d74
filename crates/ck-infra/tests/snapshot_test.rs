use std::sync::{Arc, Mutex};

use ck_core::ports::{SnapshotPort, SnapshotProgressPort};
use ck_core::AppDirs;
use ck_infra::snapshot::SnapshotManager;
use tempfile::TempDir;

struct RecordingSink {
    events: Mutex<Vec<(u8, String)>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    fn percents(&self) -> Vec<u8> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| *p)
            .collect()
    }
}

impl SnapshotProgressPort for RecordingSink {
    fn report(&self, percent: u8, status: &str) {
        self.events
            .lock()
            .unwrap()
            .push((percent, status.to_string()));
    }
}

fn seeded_dirs(root: &TempDir) -> AppDirs {
    let dirs = AppDirs::under_root(root.path());
    std::fs::create_dir_all(&dirs.data_dir).unwrap();
    std::fs::create_dir_all(dirs.temp_dir.join("nested")).unwrap();
    std::fs::create_dir_all(&dirs.config_dir).unwrap();
    std::fs::write(dirs.database_path(), b"sqlite-bytes").unwrap();
    std::fs::write(dirs.temp_dir.join("1.png"), b"png-one").unwrap();
    std::fs::write(dirs.temp_dir.join("nested").join("2.png"), b"png-two").unwrap();
    std::fs::write(
        dirs.settings_path(),
        r#"{"schema_version":1,"capture":{"poll_interval_ms":100,"max_item_size_mb":50}}"#,
    )
    .unwrap();
    dirs
}

#[tokio::test]
async fn backup_then_restore_round_trips_all_three_roots() {
    let root = TempDir::new().unwrap();
    let dirs = seeded_dirs(&root);
    let manager = SnapshotManager::new(dirs.clone());

    assert!(!manager.has_backup().await);
    assert!(manager.create_backup().await);
    assert!(manager.has_backup().await);

    // Mutate everything after the backup.
    std::fs::write(dirs.database_path(), b"mutated").unwrap();
    std::fs::remove_file(dirs.temp_dir.join("1.png")).unwrap();
    std::fs::remove_file(dirs.settings_path()).unwrap();

    assert!(manager.restore_backup().await);

    assert_eq!(std::fs::read(dirs.database_path()).unwrap(), b"sqlite-bytes");
    assert_eq!(std::fs::read(dirs.temp_dir.join("1.png")).unwrap(), b"png-one");
    assert_eq!(
        std::fs::read(dirs.temp_dir.join("nested").join("2.png")).unwrap(),
        b"png-two"
    );
    assert!(dirs.settings_path().exists());
}

#[tokio::test]
async fn backup_reports_the_fixed_progress_checkpoints() {
    let root = TempDir::new().unwrap();
    let dirs = seeded_dirs(&root);
    let manager = SnapshotManager::new(dirs);
    let sink = RecordingSink::new();
    manager.set_progress_sink(sink.clone());

    assert!(manager.create_backup().await);
    assert_eq!(sink.percents(), vec![0, 10, 20, 50, 60, 80, 90, 100]);
}

#[tokio::test]
async fn missing_source_dirs_are_skipped_not_fatal() {
    let root = TempDir::new().unwrap();
    let dirs = AppDirs::under_root(root.path());
    // Only the config root exists.
    std::fs::create_dir_all(&dirs.config_dir).unwrap();
    std::fs::write(dirs.settings_path(), b"{}").unwrap();

    let manager = SnapshotManager::new(dirs.clone());
    assert!(manager.create_backup().await);
    assert!(dirs.backup_dir.join("config").join("settings.json").exists());
    assert!(!dirs.backup_dir.join("data").exists());
}

#[tokio::test]
async fn restore_without_a_backup_is_rejected() {
    let root = TempDir::new().unwrap();
    let dirs = AppDirs::under_root(root.path());
    let manager = SnapshotManager::new(dirs);

    assert!(!manager.restore_backup().await);
}

#[tokio::test]
async fn config_merge_prefers_backup_values_but_keeps_live_only_keys() {
    let root = TempDir::new().unwrap();
    let dirs = seeded_dirs(&root);
    std::fs::write(
        dirs.settings_path(),
        r#"{"shared":"from-backup","backup_only":1}"#,
    )
    .unwrap();

    let manager = SnapshotManager::new(dirs.clone());
    assert!(manager.create_backup().await);

    std::fs::write(
        dirs.settings_path(),
        r#"{"shared":"from-live","live_only":2}"#,
    )
    .unwrap();

    assert!(manager.restore_backup().await);

    let merged: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dirs.settings_path()).unwrap()).unwrap();
    assert_eq!(merged["shared"], "from-backup");
    assert_eq!(merged["backup_only"], 1);
    assert_eq!(merged["live_only"], 2);
}

#[tokio::test]
async fn unparseable_live_config_falls_back_to_wholesale_overwrite() {
    let root = TempDir::new().unwrap();
    let dirs = seeded_dirs(&root);
    std::fs::write(dirs.settings_path(), r#"{"from":"backup"}"#).unwrap();

    let manager = SnapshotManager::new(dirs.clone());
    assert!(manager.create_backup().await);

    std::fs::write(dirs.settings_path(), b"not json at all {{{").unwrap();
    assert!(manager.restore_backup().await);

    assert_eq!(
        std::fs::read_to_string(dirs.settings_path()).unwrap(),
        r#"{"from":"backup"}"#
    );
}

#[tokio::test]
async fn non_json_config_files_are_overwritten_wholesale() {
    let root = TempDir::new().unwrap();
    let dirs = seeded_dirs(&root);
    std::fs::write(dirs.config_dir.join("notes.txt"), b"from-backup").unwrap();

    let manager = SnapshotManager::new(dirs.clone());
    assert!(manager.create_backup().await);

    std::fs::write(dirs.config_dir.join("notes.txt"), b"from-live").unwrap();
    assert!(manager.restore_backup().await);

    assert_eq!(
        std::fs::read(dirs.config_dir.join("notes.txt")).unwrap(),
        b"from-backup"
    );
}

#[tokio::test]
async fn delete_backup_is_idempotent() {
    let root = TempDir::new().unwrap();
    let dirs = seeded_dirs(&root);
    let manager = SnapshotManager::new(dirs);

    assert!(manager.delete_backup().await, "nothing to delete is success");
    assert!(manager.create_backup().await);
    assert!(manager.delete_backup().await);
    assert!(!manager.has_backup().await);
    assert!(manager.delete_backup().await);
}

#[tokio::test]
async fn clean_backup_files_leaves_an_empty_backup_root() {
    let root = TempDir::new().unwrap();
    let dirs = seeded_dirs(&root);
    let manager = SnapshotManager::new(dirs.clone());
    let sink = RecordingSink::new();
    manager.set_progress_sink(sink.clone());

    assert!(manager.create_backup().await);
    assert!(manager.clean_backup_files().await);

    assert!(dirs.backup_dir.exists());
    assert_eq!(std::fs::read_dir(&dirs.backup_dir).unwrap().count(), 0);
    let last = sink.events.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last, (100, "backup cancelled".to_string()));
}
