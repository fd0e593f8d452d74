use std::sync::Arc;

use log::warn;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use ck_core::ports::{
    BlobStorePort, ClipboardPort, ClockPort, ContentStorePort, NotifierPort, SnapshotPort,
};
use ck_core::settings::Settings;

use crate::history::HistoryService;
use crate::watcher::ClipboardWatcher;

/// Everything the application needs, resolved by the host at startup.
pub struct AppDeps {
    pub store: Arc<dyn ContentStorePort>,
    pub clipboard: Arc<dyn ClipboardPort>,
    pub blobs: Arc<dyn BlobStorePort>,
    pub notifier: Arc<dyn NotifierPort>,
    pub clock: Arc<dyn ClockPort>,
    pub snapshots: Arc<dyn SnapshotPort>,
    pub settings: Settings,
}

/// Composition root: exactly one watcher, history service and snapshot
/// manager per process, wired once from `AppDeps`.
pub struct App {
    watcher: Arc<ClipboardWatcher>,
    history: Arc<HistoryService>,
    snapshots: Arc<dyn SnapshotPort>,
    watcher_task: Mutex<Option<JoinHandle<()>>>,
}

impl App {
    pub fn new(deps: AppDeps) -> Self {
        let watcher = Arc::new(ClipboardWatcher::new(
            deps.clipboard.clone(),
            deps.store.clone(),
            deps.blobs,
            deps.notifier.clone(),
            deps.clock.clone(),
            &deps.settings,
        ));
        let history = Arc::new(HistoryService::new(
            deps.store,
            deps.clipboard,
            deps.notifier,
            deps.clock,
            watcher.clone(),
        ));
        Self {
            watcher,
            history,
            snapshots: deps.snapshots,
            watcher_task: Mutex::new(None),
        }
    }

    pub fn history(&self) -> Arc<HistoryService> {
        self.history.clone()
    }

    pub fn snapshots(&self) -> Arc<dyn SnapshotPort> {
        self.snapshots.clone()
    }

    /// Start the clipboard polling loop. Idempotent: a second call
    /// while the loop is running is a no-op.
    pub async fn start_watcher(&self) {
        let mut task = self.watcher_task.lock().await;
        if let Some(handle) = task.as_ref() {
            if !handle.is_finished() {
                warn!("clipboard watcher already running");
                return;
            }
        }
        *task = Some(self.watcher.start());
    }

    /// Stop the polling loop and wait for the current cycle to finish.
    pub async fn stop_watcher(&self) {
        let handle = {
            let mut task = self.watcher_task.lock().await;
            task.take()
        };
        if let Some(handle) = handle {
            self.watcher.stop();
            if let Err(e) = handle.await {
                warn!("clipboard watcher task ended abnormally: {e}");
            }
        }
    }

    /// Restore the on-disk roots from the backup. The watcher is
    /// stopped for the duration so no capture races the file copy, and
    /// restarted afterwards if it was running.
    pub async fn restore_backup(&self) -> bool {
        let was_running = self.watcher_task.lock().await.is_some();
        self.stop_watcher().await;

        let restored = self.snapshots.restore_backup().await;

        if was_running {
            self.start_watcher().await;
        }
        restored
    }
}
