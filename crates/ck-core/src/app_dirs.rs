use std::path::{Path, PathBuf};

/// The on-disk roots the subsystem operates on.
///
/// Three independent roots (data, temp blobs, config) plus the fixed
/// backup location the snapshot manager copies them to. Pure fact
/// container; nothing here touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    /// Database root. The SQLite file lives directly under it.
    pub data_dir: PathBuf,
    /// Temp blob root holding captured image files.
    pub temp_dir: PathBuf,
    /// Config root holding the settings file.
    pub config_dir: PathBuf,
    /// Backup root used by the snapshot manager.
    pub backup_dir: PathBuf,
}

pub const DB_FILE_NAME: &str = "clipkeep.db";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

impl AppDirs {
    /// Lay out all four roots under a single application data root.
    pub fn under_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            data_dir: root.join("data"),
            temp_dir: root.join("temp"),
            config_dir: root.join("config"),
            backup_dir: root.join("backup"),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_are_siblings_under_one_root() {
        let dirs = AppDirs::under_root("/tmp/clipkeep");
        assert!(dirs.data_dir.ends_with("data"));
        assert!(dirs.temp_dir.ends_with("temp"));
        assert!(dirs.config_dir.ends_with("config"));
        assert!(dirs.backup_dir.ends_with("backup"));
        assert!(dirs.database_path().ends_with(DB_FILE_NAME));
    }
}
