use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use ck_app::{App, AppDeps, BroadcastNotifier};
use ck_core::ports::{
    BlobStorePort, ClipboardPort, ClockPort, ContentStorePort, SettingsPort, SnapshotPort,
};
use ck_core::AppDirs;
use ck_infra::db::{init_db_pool, DieselSqliteExecutor};
use ck_infra::fs::TempBlobStore;
use ck_infra::settings::FileSettingsRepository;
use ck_infra::snapshot::SnapshotManager;
use ck_infra::store::ContentStore;
use ck_platform::{SystemClipboard, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let root = dirs::data_dir()
        .context("no platform data directory")?
        .join("clipkeep");
    let dirs = AppDirs::under_root(&root);

    tokio::fs::create_dir_all(&dirs.data_dir).await?;
    tokio::fs::create_dir_all(&dirs.config_dir).await?;

    let settings_repo = FileSettingsRepository::new(dirs.settings_path());
    let settings = settings_repo.load().await?;

    let temp_dir = settings
        .storage
        .temp_path
        .clone()
        .unwrap_or_else(|| dirs.temp_dir.clone());
    tokio::fs::create_dir_all(&temp_dir).await?;

    let pool = init_db_pool(&dirs.database_path().to_string_lossy())?;
    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);
    let store: Arc<dyn ContentStorePort> = Arc::new(ContentStore::new(
        DieselSqliteExecutor::new(pool),
        temp_dir.clone(),
        clock.clone(),
    ));
    let blobs: Arc<dyn BlobStorePort> = Arc::new(TempBlobStore::new(temp_dir));
    let clipboard: Arc<dyn ClipboardPort> = Arc::new(SystemClipboard);
    let snapshots: Arc<dyn SnapshotPort> = Arc::new(SnapshotManager::new(dirs.clone()));

    let notifier = Arc::new(BroadcastNotifier::default());
    // The watcher only captures while someone is listening; this
    // headless binary keeps one subscription alive itself.
    let mut changes = notifier.subscribe();

    let app = App::new(AppDeps {
        store,
        clipboard,
        blobs,
        notifier,
        clock,
        snapshots,
        settings,
    });

    app.start_watcher().await;
    info!("clipboard watcher running, press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = changes.recv() => {
                if received.is_ok() {
                    debug!("history changed");
                }
            }
        }
    }

    app.stop_watcher().await;
    info!("stopped");
    Ok(())
}
