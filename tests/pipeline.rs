//! End-to-end runs of the coordinator with in-process fakes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use image::{Rgb, RgbImage};
use tempfile::TempDir;
use url::Url;

use feedscan::error::{AppError, Result};
use feedscan::models::{Config, ContentFlags, Item, ItemId, ItemPage, ItemsRequest};
use feedscan::models::SkipReason;
use feedscan::pipeline::{
    CleanupPolicy, CleanupScheduler, Coordinator, ItemProcessor, PollOptions, ProcessingPolicy,
    Window, run_backfill, run_poll_until,
};
use feedscan::services::{Classifier, Downloader, ImageFetcher, ItemSource, OcrEngine};
use feedscan::storage::{CursorStore, DedupStore, MemoryStore, Sink};

const PANGRAM: &str = "The quick brown fox jumps over the lazy dog.";

fn item(id: ItemId) -> Item {
    Item {
        id,
        image: format!("2024/01/01/{id}.png"),
        created_at: Utc::now(),
        flags: ContentFlags::SFW,
    }
}

/// Serves a fixed set of items newest first, `page_size` per page.
struct FakeSource {
    items: Vec<Item>,
    page_size: usize,
    fail_on_page: Option<usize>,
    delay: std::time::Duration,
    requests: Mutex<Vec<Option<ItemId>>>,
}

impl FakeSource {
    fn new(mut items: Vec<Item>, page_size: usize) -> Self {
        items.sort_by_key(|item| std::cmp::Reverse(item.id));
        Self {
            items,
            page_size,
            fail_on_page: None,
            delay: std::time::Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing_on_page(mut self, page: usize) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    fn slow(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    fn requests(&self) -> Vec<Option<ItemId>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ItemSource for FakeSource {
    async fn fetch_page(&self, request: &ItemsRequest) -> Result<ItemPage> {
        let page_number = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.older);
            requests.len()
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_on_page == Some(page_number) {
            return Err(AppError::api("items/get", "HTTP 503"));
        }

        let remaining: Vec<Item> = self
            .items
            .iter()
            .filter(|item| request.older.is_none_or(|older| item.id < older))
            .cloned()
            .collect();
        Ok(ItemPage {
            at_end: remaining.len() <= self.page_size,
            at_start: request.older.is_none(),
            items: remaining.into_iter().take(self.page_size).collect(),
        })
    }
}

/// Writes a small PNG per item; gray items get the reference color.
struct FakeFetcher {
    dir: PathBuf,
    gray: HashSet<ItemId>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            gray: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, item: &Item) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let color = if self.gray.contains(&item.id) {
            [0x16, 0x16, 0x18]
        } else {
            [200, 40, 40]
        };
        let path = self.dir.join(format!("{}.png", item.id));
        RgbImage::from_pixel(4, 4, Rgb(color)).save(&path)?;
        Ok(path)
    }
}

/// Returns text for selected items, keyed by the file stem.
#[derive(Default)]
struct FakeOcr {
    text: HashSet<ItemId>,
    failing: HashSet<ItemId>,
    calls: AtomicUsize,
}

impl FakeOcr {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for FakeOcr {
    async fn recognize(&self, path: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let id: ItemId = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse().ok())
            .unwrap_or_default();
        if self.failing.contains(&id) {
            return Err(AppError::ocr("engine crashed"));
        }
        if self.text.contains(&id) {
            Ok(PANGRAM.to_string())
        } else {
            Ok("~ ~".to_string())
        }
    }
}

/// Dedup store whose backend is unreachable.
struct BrokenDedup;

#[async_trait]
impl DedupStore for BrokenDedup {
    async fn is_processed(&self, _item_id: ItemId) -> Result<bool> {
        Err(AppError::api("dedup", "connection refused"))
    }
}

fn processor(
    dedup: Arc<dyn DedupStore>,
    fetcher: Arc<dyn ImageFetcher>,
    ocr: Arc<FakeOcr>,
    sink: Arc<dyn Sink>,
) -> Arc<ItemProcessor> {
    processor_with_cleanup(dedup, fetcher, ocr, sink, CleanupPolicy::Keep)
}

fn processor_with_cleanup(
    dedup: Arc<dyn DedupStore>,
    fetcher: Arc<dyn ImageFetcher>,
    ocr: Arc<FakeOcr>,
    sink: Arc<dyn Sink>,
    cleanup: CleanupPolicy,
) -> Arc<ItemProcessor> {
    let classifier = Classifier::from_config(&Config::default(), ocr);
    Arc::new(ItemProcessor::new(
        dedup,
        fetcher,
        Arc::new(classifier),
        sink,
        Arc::new(CleanupScheduler::new(cleanup)),
    ))
}

fn poll_options(once: bool) -> PollOptions {
    PollOptions {
        flags: ContentFlags::SFW,
        max_age: Duration::hours(1),
        interval: std::time::Duration::from_millis(20),
        max_pages: 0,
        once,
    }
}

fn png_files(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path())
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .is_ok_and(|entry| entry.path().extension().is_some_and(|ext| ext == "png"))
        })
        .count()
}

fn sorted(mut ids: Vec<ItemId>) -> Vec<ItemId> {
    ids.sort_unstable();
    ids
}

#[tokio::test]
async fn test_already_processed_items_are_skipped() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::with_processed([6]));
    let fetcher = Arc::new(FakeFetcher::new(dir.path()));
    let ocr = Arc::new(FakeOcr::default());
    let source = Arc::new(FakeSource::new(vec![item(5), item(6), item(7)], 10));

    let coordinator = Coordinator::new(
        source,
        processor(store.clone(), fetcher.clone(), ocr.clone(), store.clone()),
        4,
    );
    let policy = ProcessingPolicy::Concurrent { workers: 2 };
    let summary = coordinator
        .run(&Window::backfill(ContentFlags::SFW, None), &policy)
        .await
        .unwrap();

    assert_eq!(summary.queued, 3);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(sorted(store.published_ids()), vec![5, 7]);
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(ocr.calls(), 2);
}

#[tokio::test]
async fn test_every_item_gets_exactly_one_outcome() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(FakeFetcher::new(dir.path()));
    let ocr = Arc::new(FakeOcr::default());
    let source = Arc::new(FakeSource::new((1..=40).map(item).collect(), 7));

    let coordinator = Coordinator::new(
        source,
        processor(store.clone(), fetcher.clone(), ocr.clone(), store.clone()),
        3,
    );
    let policy = ProcessingPolicy::Concurrent { workers: 4 };
    let summary = coordinator
        .run(&Window::backfill(ContentFlags::SFW, None), &policy)
        .await
        .unwrap();

    assert_eq!(summary.queued, 40);
    assert_eq!(summary.outcomes(), 40);
    assert_eq!(summary.processed, 40);
    assert_eq!(sorted(store.published_ids()), (1..=40).collect::<Vec<_>>());
    assert_eq!(ocr.calls(), 40);
}

#[tokio::test]
async fn test_tags_reach_the_sink() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let mut fetcher = FakeFetcher::new(dir.path());
    fetcher.gray.insert(2);
    let ocr = Arc::new(FakeOcr {
        text: HashSet::from([1]),
        ..FakeOcr::default()
    });
    let source = Arc::new(FakeSource::new(vec![item(1), item(2), item(3)], 10));

    let coordinator = Coordinator::new(
        source,
        processor(store.clone(), Arc::new(fetcher), ocr, store.clone()),
        4,
    );
    let policy = ProcessingPolicy::Concurrent { workers: 3 };
    let summary = coordinator
        .run(&Window::backfill(ContentFlags::SFW, None), &policy)
        .await
        .unwrap();

    assert_eq!(summary.tagged, 2);
    let mut published = store.published();
    published.sort_by_key(|result| result.item_id);
    assert_eq!(published[0].joined_tags(), "text");
    assert!(published[1].correct_gray);
    assert_eq!(published[1].joined_tags(), "richtiges grau");
    assert!(!published[2].is_tagged());
}

#[tokio::test]
async fn test_ascending_halts_before_failed_item() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let cursor = Arc::new(CursorStore::new());
    let fetcher = Arc::new(FakeFetcher::new(dir.path()));
    let ocr = Arc::new(FakeOcr {
        failing: HashSet::from([3]),
        ..FakeOcr::default()
    });
    let source = Arc::new(FakeSource::new((1..=5).map(item).collect(), 2));

    let coordinator = Coordinator::new(
        source,
        processor(cursor.clone(), fetcher, ocr.clone(), store.clone()),
        8,
    );
    let policy = ProcessingPolicy::Ascending {
        cursor: Arc::clone(&cursor),
    };
    let window = Window::recent(ContentFlags::SFW, Duration::hours(1));
    let summary = coordinator.run(&window, &policy).await.unwrap();

    assert!(summary.halted);
    assert_eq!(summary.queued, 5);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.deferred, 2);
    assert_eq!(cursor.latest().await, Some(2));
    assert_eq!(store.published_ids(), vec![1, 2]);
    assert_eq!(ocr.calls(), 3);
}

#[tokio::test]
async fn test_ascending_resumes_above_cursor() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let cursor = Arc::new(CursorStore::starting_at(3));
    let fetcher = Arc::new(FakeFetcher::new(dir.path()));
    let ocr = Arc::new(FakeOcr::default());
    let source = Arc::new(FakeSource::new((1..=6).map(item).collect(), 2));

    let coordinator = Coordinator::new(
        source.clone(),
        processor(cursor.clone(), fetcher.clone(), ocr, store.clone()),
        8,
    );
    let policy = ProcessingPolicy::Ascending {
        cursor: Arc::clone(&cursor),
    };
    let window =
        Window::recent(ContentFlags::SFW, Duration::hours(1)).newer_than(cursor.latest().await);
    let summary = coordinator.run(&window, &policy).await.unwrap();

    assert_eq!(summary.queued, 3);
    assert_eq!(store.published_ids(), vec![4, 5, 6]);
    assert_eq!(cursor.latest().await, Some(6));
    // Paging stops on the page that reached the cursor.
    assert_eq!(source.requests(), vec![None, Some(5)]);
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn test_recency_window_drops_old_items() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(FakeFetcher::new(dir.path()));
    let ocr = Arc::new(FakeOcr::default());

    let mut items: Vec<Item> = (1..=4).map(item).collect();
    for old in items.iter_mut().filter(|item| item.id <= 2) {
        old.created_at = Utc::now() - Duration::hours(2);
    }
    let source = Arc::new(FakeSource::new(items, 10));

    let coordinator = Coordinator::new(
        source,
        processor(store.clone(), fetcher.clone(), ocr, store.clone()),
        4,
    );
    let policy = ProcessingPolicy::Concurrent { workers: 2 };
    let summary = coordinator
        .run(&Window::recent(ContentFlags::SFW, Duration::hours(1)), &policy)
        .await
        .unwrap();

    assert_eq!(summary.queued, 2);
    assert_eq!(summary.too_old, 2);
    assert_eq!(sorted(store.published_ids()), vec![3, 4]);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_backfill_pages_by_oldest_id() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(FakeFetcher::new(dir.path()));
    let ocr = Arc::new(FakeOcr::default());
    let source = Arc::new(FakeSource::new((1..=25).map(item).collect(), 10));

    let coordinator = Coordinator::new(
        source.clone(),
        processor(store.clone(), fetcher, ocr, store.clone()),
        4,
    );
    let policy = ProcessingPolicy::Concurrent { workers: 3 };
    let summary = coordinator
        .run(&Window::backfill(ContentFlags::SFW, Some(26)), &policy)
        .await
        .unwrap();

    assert_eq!(summary.processed, 25);
    assert_eq!(source.requests(), vec![Some(26), Some(16), Some(6)]);
}

#[tokio::test]
async fn test_page_limit_stops_paging() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(FakeFetcher::new(dir.path()));
    let ocr = Arc::new(FakeOcr::default());
    let source = Arc::new(FakeSource::new((1..=25).map(item).collect(), 10));

    let coordinator = Coordinator::new(
        source.clone(),
        processor(store.clone(), fetcher, ocr, store.clone()),
        4,
    );
    let policy = ProcessingPolicy::Concurrent { workers: 2 };
    let window = Window::backfill(ContentFlags::SFW, None).with_max_pages(1);
    let summary = coordinator.run(&window, &policy).await.unwrap();

    assert_eq!(summary.queued, 10);
    assert_eq!(source.requests(), vec![None]);
}

#[tokio::test]
async fn test_non_images_are_skipped_without_download() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(FakeFetcher::new(dir.path()));
    let ocr = Arc::new(FakeOcr::default());

    let mut video = item(2);
    video.image = "2024/01/01/clip.mp4".to_string();
    let source = Arc::new(FakeSource::new(vec![item(1), video], 10));

    let coordinator = Coordinator::new(
        source,
        processor(store.clone(), fetcher.clone(), ocr, store.clone()),
        4,
    );
    let policy = ProcessingPolicy::Concurrent { workers: 2 };
    let summary = coordinator
        .run(&Window::backfill(ContentFlags::SFW, None), &policy)
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(store.published_ids(), vec![1]);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_malformed_reference_never_reaches_ocr() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let cursor = Arc::new(CursorStore::new());
    let ocr = Arc::new(FakeOcr::default());
    let downloader = Downloader::new(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:9/").unwrap(),
        dir.path(),
    );

    let mut malformed = item(1);
    malformed.image = "//evil.example/payload.png".to_string();
    let source = Arc::new(FakeSource::new(vec![malformed], 10));

    let coordinator = Coordinator::new(
        source,
        processor(cursor.clone(), Arc::new(downloader), ocr.clone(), store.clone()),
        4,
    );
    let policy = ProcessingPolicy::Ascending {
        cursor: Arc::clone(&cursor),
    };
    let window = Window::recent(ContentFlags::SFW, Duration::hours(1));
    let summary = coordinator.run(&window, &policy).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert!(!summary.halted);
    assert_eq!(ocr.calls(), 0);
    assert!(store.published_ids().is_empty());
    // A malformed reference is a permanent failure, so the cursor moves on.
    assert_eq!(cursor.latest().await, Some(1));
}

#[tokio::test]
async fn test_source_error_after_queued_items_drain() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(FakeFetcher::new(dir.path()));
    let ocr = Arc::new(FakeOcr::default());
    let source = Arc::new(FakeSource::new((1..=20).map(item).collect(), 5).failing_on_page(2));

    let coordinator = Coordinator::new(
        source,
        processor(store.clone(), fetcher, ocr, store.clone()),
        2,
    );
    let policy = ProcessingPolicy::Concurrent { workers: 2 };
    let result = coordinator
        .run(&Window::backfill(ContentFlags::SFW, None), &policy)
        .await;

    assert!(matches!(result, Err(AppError::Api { .. })));
    assert_eq!(sorted(store.published_ids()), vec![16, 17, 18, 19, 20]);
}

#[tokio::test]
async fn test_failed_dedup_check_skips_without_download() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(FakeFetcher::new(dir.path()));
    let ocr = Arc::new(FakeOcr::default());
    let source = Arc::new(FakeSource::new(vec![item(1), item(2)], 10));

    let processor = processor(Arc::new(BrokenDedup), fetcher.clone(), ocr.clone(), store.clone());
    let outcome = processor.process(&item(1)).await;
    assert!(matches!(outcome, feedscan::models::Outcome::Skipped(SkipReason::CheckFailed)));
    assert!(!outcome.is_final());

    let coordinator = Coordinator::new(source, processor, 4);
    let policy = ProcessingPolicy::Concurrent { workers: 2 };
    let summary = coordinator
        .run(&Window::backfill(ContentFlags::SFW, None), &policy)
        .await
        .unwrap();

    assert_eq!(summary.skipped, 2);
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(ocr.calls(), 0);
    assert!(store.published_ids().is_empty());
}

#[tokio::test]
async fn test_failed_dedup_check_halts_ascending_batch() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let cursor = Arc::new(CursorStore::new());
    let fetcher = Arc::new(FakeFetcher::new(dir.path()));
    let source = Arc::new(FakeSource::new(vec![item(1), item(2), item(3)], 10));

    let coordinator = Coordinator::new(
        source,
        processor(
            Arc::new(BrokenDedup),
            fetcher.clone(),
            Arc::new(FakeOcr::default()),
            store.clone(),
        ),
        4,
    );
    let policy = ProcessingPolicy::Ascending {
        cursor: Arc::clone(&cursor),
    };
    let window = Window::recent(ContentFlags::SFW, Duration::hours(1));
    let summary = coordinator.run(&window, &policy).await.unwrap();

    assert!(summary.halted);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.deferred, 2);
    assert_eq!(cursor.latest().await, None);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_backfill_flushes_deferred_cleanup() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(FakeFetcher::new(dir.path()));
    let source = Arc::new(FakeSource::new((1..=3).map(item).collect(), 10));

    let coordinator = Coordinator::new(
        source,
        processor_with_cleanup(
            store.clone(),
            fetcher.clone(),
            Arc::new(FakeOcr::default()),
            store.clone(),
            CleanupPolicy::Deferred(std::time::Duration::from_secs(3600)),
        ),
        4,
    );
    let policy = ProcessingPolicy::Concurrent { workers: 2 };
    let summary = run_backfill(&coordinator, &Window::backfill(ContentFlags::SFW, None), &policy)
        .await
        .unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(fetcher.calls(), 3);
    assert_eq!(png_files(&dir), 0);
    assert_eq!(coordinator.processor().cleanup().pending(), 0);
}

#[tokio::test]
async fn test_poll_once_returns_after_one_poll() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let cursor = Arc::new(CursorStore::new());
    let fetcher = Arc::new(FakeFetcher::new(dir.path()));
    let source = Arc::new(FakeSource::new((1..=3).map(item).collect(), 10));

    let coordinator = Coordinator::new(
        source.clone(),
        processor_with_cleanup(
            cursor.clone(),
            fetcher,
            Arc::new(FakeOcr::default()),
            store.clone(),
            CleanupPolicy::Deferred(std::time::Duration::from_secs(3600)),
        ),
        4,
    );
    let policy = ProcessingPolicy::Ascending {
        cursor: Arc::clone(&cursor),
    };
    let totals = run_poll_until(
        &coordinator,
        &policy,
        &poll_options(true),
        std::future::pending::<()>(),
    )
    .await
    .unwrap();

    assert_eq!(totals.processed, 3);
    assert_eq!(source.requests().len(), 1);
    assert_eq!(cursor.latest().await, Some(3));
    assert_eq!(store.published_ids(), vec![1, 2, 3]);
    // Deferred deletions are flushed when the loop returns.
    assert_eq!(png_files(&dir), 0);
}

#[tokio::test]
async fn test_poll_totals_add_up_across_polls() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(FakeSource::new((1..=3).map(item).collect(), 10));

    let coordinator = Coordinator::new(
        source.clone(),
        processor(
            store.clone(),
            Arc::new(FakeFetcher::new(dir.path())),
            Arc::new(FakeOcr::default()),
            store.clone(),
        ),
        4,
    );
    let policy = ProcessingPolicy::Concurrent { workers: 2 };
    let watched = Arc::clone(&source);
    let third_poll_started = async move {
        while watched.requests().len() < 3 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    };
    let totals = run_poll_until(&coordinator, &policy, &poll_options(false), third_poll_started)
        .await
        .unwrap();

    // The first poll processes everything; later polls only see duplicates.
    assert!(totals.queued >= 6, "{totals:?}");
    assert_eq!(totals.queued % 3, 0);
    assert_eq!(totals.processed, 3);
    assert_eq!(totals.skipped, totals.queued - 3);
    assert_eq!(store.published_ids(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_shutdown_interrupts_running_poll() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(FakeFetcher::new(dir.path()));
    let source = Arc::new(
        FakeSource::new((1..=3).map(item).collect(), 10).slow(std::time::Duration::from_secs(30)),
    );

    let coordinator = Coordinator::new(
        source.clone(),
        processor(
            store.clone(),
            fetcher.clone(),
            Arc::new(FakeOcr::default()),
            store.clone(),
        ),
        4,
    );
    let policy = ProcessingPolicy::Concurrent { workers: 2 };
    let interrupt = tokio::time::sleep(std::time::Duration::from_millis(200));

    let totals = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        run_poll_until(&coordinator, &policy, &poll_options(false), interrupt),
    )
    .await
    .expect("poll loop ignored shutdown")
    .unwrap();

    assert_eq!(source.requests().len(), 1);
    assert_eq!(totals, feedscan::models::RunSummary::default());
    assert_eq!(fetcher.calls(), 0);
}
