use super::model::*;

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            max_item_size_mb: 50,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            max_history_items: 500,
            max_storage_mb: 1024,
            auto_cleanup_days: 30,
            temp_path: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            capture: CaptureSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}
