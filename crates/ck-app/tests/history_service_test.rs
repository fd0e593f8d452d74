use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ck_app::{ClipboardWatcher, HistoryService};
use ck_core::clipboard::{EntryFilter, NewClipItem, TagSelector};
use ck_core::ports::{
    BlobStorePort, ClipboardPort, ClockPort, ContentStorePort, NotifierPort,
};
use ck_core::settings::Settings;
use ck_core::StoreError;
use ck_infra::db::{init_test_pool, DieselSqliteExecutor};
use ck_infra::fs::TempBlobStore;
use ck_infra::store::ContentStore;
use tempfile::TempDir;

struct FakeClipboard {
    text: Mutex<Option<String>>,
    image: Mutex<Option<Vec<u8>>>,
}

#[async_trait]
impl ClipboardPort for FakeClipboard {
    async fn read_text(&self) -> anyhow::Result<Option<String>> {
        Ok(self.text.lock().unwrap().clone())
    }

    async fn read_image(&self) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.image.lock().unwrap().clone())
    }

    async fn write_text(&self, text: String) -> anyhow::Result<()> {
        *self.text.lock().unwrap() = Some(text);
        Ok(())
    }

    async fn write_image(&self, png_bytes: Vec<u8>) -> anyhow::Result<()> {
        *self.image.lock().unwrap() = Some(png_bytes);
        Ok(())
    }
}

struct CountingNotifier(AtomicUsize);

impl NotifierPort for CountingNotifier {
    fn store_changed(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct FixedClock(i64);

impl ClockPort for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}

struct Harness {
    clipboard: Arc<FakeClipboard>,
    notifier: Arc<CountingNotifier>,
    store: Arc<dyn ContentStorePort>,
    service: HistoryService,
    watcher: Arc<ClipboardWatcher>,
    _temp: TempDir,
}

fn harness() -> Harness {
    let temp = TempDir::new().unwrap();
    let pool = init_test_pool().expect("in-memory pool");
    let clock = Arc::new(FixedClock(50_000));
    let store: Arc<dyn ContentStorePort> = Arc::new(ContentStore::new(
        DieselSqliteExecutor::new(pool),
        temp.path(),
        clock.clone(),
    ));
    let clipboard = Arc::new(FakeClipboard {
        text: Mutex::new(None),
        image: Mutex::new(None),
    });
    let notifier = Arc::new(CountingNotifier(AtomicUsize::new(0)));
    let blobs: Arc<dyn BlobStorePort> = Arc::new(TempBlobStore::new(temp.path()));

    let watcher = Arc::new(ClipboardWatcher::new(
        clipboard.clone(),
        store.clone(),
        blobs,
        notifier.clone(),
        clock.clone(),
        &Settings::default(),
    ));
    let service = HistoryService::new(
        store.clone(),
        clipboard.clone(),
        notifier.clone(),
        clock,
        watcher.clone(),
    );

    Harness {
        clipboard,
        notifier,
        store,
        service,
        watcher,
        _temp: temp,
    }
}

#[tokio::test]
async fn recopy_writes_text_back_and_bumps_recency() {
    let h = harness();
    let id = h.store.add_item(NewClipItem::text("old clip")).await.unwrap();

    h.service.recopy_entry(id).await.unwrap();

    assert_eq!(
        h.clipboard.text.lock().unwrap().as_deref(),
        Some("old clip")
    );
    let entry = h.store.get_item_by_id(id).await.unwrap().unwrap();
    assert_eq!(entry.captured_at, 50_000, "recency bumped to now");
    assert_eq!(h.notifier.0.load(Ordering::SeqCst), 1);

    // The watcher must not re-ingest our own write on the next poll.
    h.watcher.check_once().await.unwrap();
    assert_eq!(h.store.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn recopy_reads_image_bytes_from_the_blob() {
    let h = harness();
    let blob = h._temp.path().join("50000.png");
    std::fs::write(&blob, b"png-payload").unwrap();
    let id = h
        .store
        .add_item(NewClipItem::image(
            "50000.png",
            blob.to_string_lossy().into_owned(),
            11,
        ))
        .await
        .unwrap();

    h.service.recopy_entry(id).await.unwrap();

    assert_eq!(
        h.clipboard.image.lock().unwrap().as_deref(),
        Some(b"png-payload".as_slice())
    );

    h.watcher.check_once().await.unwrap();
    assert_eq!(h.store.get_all().await.unwrap().len(), 1, "no re-ingest");
}

#[tokio::test]
async fn recopy_of_a_missing_entry_is_not_found() {
    let h = harness();
    let err = h.service.recopy_entry(404).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound("item")));
    assert_eq!(h.notifier.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mutations_emit_change_signals_and_queries_do_not() {
    let h = harness();
    let id = h.store.add_item(NewClipItem::text("x")).await.unwrap();

    let tag = h.service.add_tag("work", None).await.unwrap();
    h.service
        .bind_tag(id, TagSelector::Id(tag.id))
        .await
        .unwrap();
    h.service.toggle_pin(id, true).await.unwrap();
    h.service.unbind_tag(id, tag.id).await.unwrap();
    h.service.delete_tag(tag.id).await.unwrap();
    h.service.delete_item(id).await.unwrap();
    assert_eq!(h.notifier.0.load(Ordering::SeqCst), 6);

    h.service.list_all().await.unwrap();
    h.service
        .search_paged(EntryFilter::default(), 1, 10)
        .await
        .unwrap();
    h.service.get_all_tags().await.unwrap();
    assert_eq!(h.notifier.0.load(Ordering::SeqCst), 6, "queries are silent");
}

#[tokio::test]
async fn watcher_and_service_share_one_store() {
    let h = harness();
    h.clipboard
        .text
        .lock()
        .unwrap()
        .replace("captured by watcher".into());

    // Notifier has no ready() override here, so cycles always run.
    h.watcher.check_once().await.unwrap();

    let entries = h.service.list_all().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].content, "captured by watcher");
}
