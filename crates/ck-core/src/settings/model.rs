use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::clipboard::RetentionPolicy;
use crate::error::StoreError;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Capture-side knobs read by the clipboard watcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Delay between watcher poll cycles. The loop is self-resubmitting,
    /// so this is the gap after a cycle completes, not a fixed rate.
    pub poll_interval_ms: u64,

    /// Ceiling for a single clip, text or image, in megabytes.
    pub max_item_size_mb: u32,
}

/// Storage and retention knobs read by the content store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Maximum number of history entries. 0 disables count eviction.
    pub max_history_items: u32,

    /// Budget for image blob bytes on disk, in megabytes. 0 disables
    /// size eviction.
    pub max_storage_mb: u32,

    /// Entries older than this many days are evicted. 0 disables age
    /// eviction.
    pub auto_cleanup_days: u32,

    /// Override for the temp blob directory. `None` uses the default
    /// layout under the app data root.
    pub temp_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub capture: CaptureSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

fn current_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

impl Settings {
    /// Validate loaded settings. Bad values are a config-file problem
    /// the user should see, not something to silently clamp.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.capture.poll_interval_ms == 0 {
            return Err(StoreError::InvalidInput(
                "capture.poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.capture.max_item_size_mb == 0 {
            return Err(StoreError::InvalidInput(
                "capture.max_item_size_mb must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn max_item_size_bytes(&self) -> u64 {
        self.capture.max_item_size_mb as u64 * 1024 * 1024
    }

    /// Derive the retention budgets for the maintenance sweep. Zeroed
    /// knobs disable the corresponding rule.
    pub fn retention_policy(&self) -> RetentionPolicy {
        let nonzero_u32 = |v: u32| (v > 0).then_some(v);
        RetentionPolicy {
            max_items: nonzero_u32(self.storage.max_history_items).map(|v| v as usize),
            max_age_days: nonzero_u32(self.storage.auto_cleanup_days),
            max_total_bytes: nonzero_u32(self.storage.max_storage_mb)
                .map(|v| v as u64 * 1024 * 1024),
        }
    }
}
