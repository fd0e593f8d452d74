use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{error, warn};
use serde_json::Value;
use tokio::fs;

use ck_core::ports::{NullProgressSink, SnapshotPort, SnapshotProgressPort};
use ck_core::AppDirs;

const BACKUP_DATA_DIR: &str = "data";
const BACKUP_TEMP_DIR: &str = "temp";
const BACKUP_CONFIG_DIR: &str = "config";

/// Point-in-time backup and restore of the three on-disk roots.
///
/// Works on the files directly rather than through the store, so it can
/// run while the database is closed (the update/reinstall cycle it
/// exists for). At most one backup and one restore may be in flight;
/// a second concurrent request is rejected, not queued. Failures abort
/// the whole operation and leave partial state on disk; `has_backup`
/// and restore simply work with whatever is present.
pub struct SnapshotManager {
    dirs: AppDirs,
    backing_up: AtomicBool,
    restoring: AtomicBool,
    sink: RwLock<Arc<dyn SnapshotProgressPort>>,
}

impl SnapshotManager {
    pub fn new(dirs: AppDirs) -> Self {
        Self {
            dirs,
            backing_up: AtomicBool::new(false),
            restoring: AtomicBool::new(false),
            sink: RwLock::new(Arc::new(NullProgressSink)),
        }
    }

    fn report(&self, percent: u8, status: &str) {
        if let Ok(sink) = self.sink.read() {
            sink.report(percent, status);
        }
    }

    async fn create_backup_inner(&self) -> Result<()> {
        let root = &self.dirs.backup_dir;
        self.report(0, "starting backup");

        if fs::try_exists(root).await? {
            fs::remove_dir_all(root)
                .await
                .with_context(|| format!("remove stale backup root {}", root.display()))?;
        }
        self.report(10, "removed stale backup");

        fs::create_dir_all(root)
            .await
            .with_context(|| format!("create backup root {}", root.display()))?;
        self.report(20, "created backup root");

        self.backup_root(&self.dirs.data_dir, BACKUP_DATA_DIR, "data")
            .await?;
        self.report(50, "backed up history database");

        self.backup_root(&self.dirs.temp_dir, BACKUP_TEMP_DIR, "temp")
            .await?;
        self.report(60, "backed up image files");

        self.backup_root(&self.dirs.config_dir, BACKUP_CONFIG_DIR, "config")
            .await?;
        self.report(80, "backed up configuration");

        self.report(90, "finalizing backup");
        Ok(())
    }

    /// Copy one live root into the backup root. A missing source is a
    /// warning, not a failure; the backup proceeds with what exists.
    async fn backup_root(&self, source: &Path, dest_name: &str, label: &str) -> Result<()> {
        if !fs::try_exists(source).await? {
            warn!("{label} dir missing, skipping: {}", source.display());
            return Ok(());
        }
        let dest = self.dirs.backup_dir.join(dest_name);
        copy_dir(source, &dest).await
    }

    async fn restore_backup_inner(&self) -> Result<()> {
        self.report(0, "starting restore");

        let data_src = self.dirs.backup_dir.join(BACKUP_DATA_DIR);
        if fs::try_exists(&data_src).await? {
            overwrite_dir(&data_src, &self.dirs.data_dir).await?;
        }
        self.report(50, "restored history database");

        let temp_src = self.dirs.backup_dir.join(BACKUP_TEMP_DIR);
        if fs::try_exists(&temp_src).await? {
            overwrite_dir(&temp_src, &self.dirs.temp_dir).await?;
        }
        self.report(60, "restored image files");

        let config_src = self.dirs.backup_dir.join(BACKUP_CONFIG_DIR);
        if fs::try_exists(&config_src).await? {
            merge_config_dir(&config_src, &self.dirs.config_dir).await?;
        }
        self.report(90, "restored configuration");

        Ok(())
    }
}

#[async_trait]
impl SnapshotPort for SnapshotManager {
    /// Register the single progress sink. Replaces any previous one.
    fn set_progress_sink(&self, sink: Arc<dyn SnapshotProgressPort>) {
        if let Ok(mut slot) = self.sink.write() {
            *slot = sink;
        }
    }

    async fn has_backup(&self) -> bool {
        fs::try_exists(&self.dirs.backup_dir).await.unwrap_or(false)
    }

    async fn create_backup(&self) -> bool {
        if self
            .backing_up
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("backup already in progress, rejecting request");
            return false;
        }

        let result = self.create_backup_inner().await;
        self.backing_up.store(false, Ordering::SeqCst);

        match result {
            Ok(()) => {
                self.report(100, "backup complete");
                true
            }
            Err(e) => {
                error!("backup failed: {e:#}");
                self.report(100, "backup failed");
                false
            }
        }
    }

    async fn restore_backup(&self) -> bool {
        if self
            .restoring
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("restore already in progress, rejecting request");
            return false;
        }
        if !self.has_backup().await {
            warn!("no backup present, nothing to restore");
            self.restoring.store(false, Ordering::SeqCst);
            return false;
        }

        let result = self.restore_backup_inner().await;
        self.restoring.store(false, Ordering::SeqCst);

        match result {
            Ok(()) => {
                self.report(100, "restore complete");
                true
            }
            Err(e) => {
                error!("restore failed: {e:#}");
                self.report(100, "restore failed");
                false
            }
        }
    }

    async fn delete_backup(&self) -> bool {
        let root = &self.dirs.backup_dir;
        match fs::try_exists(root).await {
            Ok(false) => true,
            Ok(true) => match fs::remove_dir_all(root).await {
                Ok(()) => true,
                Err(e) => {
                    error!("delete backup failed: {e}");
                    false
                }
            },
            Err(e) => {
                error!("probe backup root failed: {e}");
                false
            }
        }
    }

    /// Cancel an in-flight backup: reset the flag and leave an empty
    /// backup root behind.
    async fn clean_backup_files(&self) -> bool {
        self.backing_up.store(false, Ordering::SeqCst);
        let root = &self.dirs.backup_dir;

        let result: Result<()> = async {
            if fs::try_exists(root).await? {
                fs::remove_dir_all(root).await?;
            }
            fs::create_dir_all(root).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                self.report(100, "backup cancelled");
                true
            }
            Err(e) => {
                error!("clean backup files failed: {e}");
                false
            }
        }
    }
}

/// Recursive directory copy via an explicit worklist; async fns cannot
/// recurse without boxing.
async fn copy_dir(source: &Path, dest: &Path) -> Result<()> {
    let mut work: Vec<(PathBuf, PathBuf)> = vec![(source.to_path_buf(), dest.to_path_buf())];

    while let Some((src, dst)) = work.pop() {
        fs::create_dir_all(&dst)
            .await
            .with_context(|| format!("create dir {}", dst.display()))?;

        let mut entries = fs::read_dir(&src)
            .await
            .with_context(|| format!("read dir {}", src.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let from = entry.path();
            let to = dst.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                work.push((from, to));
            } else {
                fs::copy(&from, &to)
                    .await
                    .with_context(|| format!("copy {} -> {}", from.display(), to.display()))?;
            }
        }
    }
    Ok(())
}

/// Replace `dest` wholesale with the contents of `source`.
async fn overwrite_dir(source: &Path, dest: &Path) -> Result<()> {
    if fs::try_exists(dest).await? {
        fs::remove_dir_all(dest)
            .await
            .with_context(|| format!("remove dir {}", dest.display()))?;
    }
    copy_dir(source, dest).await
}

/// Restore the config root, merging rather than clobbering.
///
/// Per file: directories are skipped; files absent from the live config
/// are copied verbatim; `.json` files are shallow-merged as objects
/// with backup values winning for shared keys and live-only keys
/// preserved; a parse failure on either side falls back to a wholesale
/// overwrite, as do non-JSON files.
async fn merge_config_dir(source: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)
        .await
        .with_context(|| format!("create config dir {}", dest.display()))?;

    let mut entries = fs::read_dir(source)
        .await
        .with_context(|| format!("read backup config dir {}", source.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            continue;
        }
        let from = entry.path();
        let to = dest.join(entry.file_name());

        if !fs::try_exists(&to).await? {
            fs::copy(&from, &to)
                .await
                .with_context(|| format!("copy config {} -> {}", from.display(), to.display()))?;
            continue;
        }

        let is_json = from
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            match merge_json_file(&from, &to).await {
                Ok(()) => continue,
                Err(e) => {
                    warn!(
                        "config merge failed for {}, overwriting wholesale: {e}",
                        to.display()
                    );
                }
            }
        }

        fs::copy(&from, &to)
            .await
            .with_context(|| format!("copy config {} -> {}", from.display(), to.display()))?;
    }
    Ok(())
}

/// Shallow object merge with backup precedence. Live keys absent from
/// the backup survive.
async fn merge_json_file(backup: &Path, live: &Path) -> Result<()> {
    let backup_raw = fs::read_to_string(backup).await?;
    let live_raw = fs::read_to_string(live).await?;

    let backup_value: Value = serde_json::from_str(&backup_raw)?;
    let live_value: Value = serde_json::from_str(&live_raw)?;

    let merged = match (live_value, backup_value) {
        (Value::Object(mut live_map), Value::Object(backup_map)) => {
            for (key, value) in backup_map {
                live_map.insert(key, value);
            }
            Value::Object(live_map)
        }
        // Non-object JSON has no keys to merge; the backup wins.
        (_, backup_value) => backup_value,
    };

    let content = serde_json::to_string_pretty(&merged)?;
    fs::write(live, content)
        .await
        .with_context(|| format!("write merged config {}", live.display()))?;
    Ok(())
}
