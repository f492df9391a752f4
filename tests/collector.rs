use async_trait::async_trait;
use auction_collect::api::model::RawItem;
use auction_collect::api::AuctionSource;
use auction_collect::config::{CollectorConfig, RetryPolicy};
use auction_collect::core::processor::Collector;
use auction_collect::core::stats::{CAT_CHUNK_SAVE, CAT_PAGE_FETCH, CAT_SNAPSHOT_SAVE};
use auction_collect::error::{AppError, AppResult};
use auction_collect::io::merge::{merge_chunk_files_blocking, read_records};
use auction_collect::io::{snapshot_file_name, SnapshotKind};
use auction_collect::model::{AuctionRecord, PageRequest};
use auction_collect::transform::map_record;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// In-memory listing service: pages are sliced out of `total` synthetic items.
#[derive(Default)]
struct ScriptedSource {
    total: u64,
    count_fails: bool,
    failing_pages: HashSet<u32>,
    panicking_pages: HashSet<u32>,
    /// Pages with a lower number answer more slowly by this many ms per page.
    stagger_ms: u64,
    interrupt: Mutex<Option<(u32, oneshot::Sender<()>)>>,
    requests: Mutex<Vec<PageRequest>>,
    served: Mutex<Vec<(u32, usize)>>,
}

impl ScriptedSource {
    fn with_total(total: u64) -> Self {
        ScriptedSource {
            total,
            ..Default::default()
        }
    }

    fn attempts_for(&self, page_no: u32) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.page_no == page_no)
            .count()
    }

    fn served(&self) -> Vec<(u32, usize)> {
        let mut served = self.served.lock().unwrap().clone();
        served.sort();
        served
    }
}

fn listing(seq: u64) -> AuctionRecord {
    map_record(&RawItem::from([
        ("RNUM".to_string(), seq.to_string()),
        ("CLTR_MNMT_NO".to_string(), format!("2024-0100-{:06}", seq)),
        ("CLTR_NM".to_string(), format!("공매물건 {}", seq)),
        ("CLTR_HSTR_NO".to_string(), (9000 + seq).to_string()),
        ("CLTR_NO".to_string(), (8000 + seq).to_string()),
        ("PLNM_NO".to_string(), "700".to_string()),
        ("PBCT_NO".to_string(), "600".to_string()),
        ("SCRN_GRP_CD".to_string(), "0001".to_string()),
        ("PBCT_CDTN_NO".to_string(), "500".to_string()),
    ]))
}

#[async_trait]
impl AuctionSource for ScriptedSource {
    async fn fetch_total_count(&self, _disposal_method: &str) -> AppResult<u64> {
        if self.count_fails {
            return Err(AppError::Transport("connection refused".into()));
        }
        Ok(self.total)
    }

    async fn fetch_page(&self, request: &PageRequest) -> AppResult<Vec<AuctionRecord>> {
        self.requests.lock().unwrap().push(request.clone());
        let page_no = request.page_no;

        let signal = {
            let mut guard = self.interrupt.lock().unwrap();
            if guard.as_ref().map(|(page, _)| *page) == Some(page_no) {
                guard.take().map(|(_, tx)| tx)
            } else {
                None
            }
        };
        if let Some(tx) = signal {
            let _ = tx.send(());
            std::future::pending::<()>().await;
        }

        if self.panicking_pages.contains(&page_no) {
            panic!("worker crashed on page {}", page_no);
        }
        if self.failing_pages.contains(&page_no) {
            return Err(AppError::api_error("22", "LIMITED NUMBER OF SERVICE REQUESTS"));
        }
        if self.stagger_ms > 0 {
            let delay = self.stagger_ms * u64::from(10u32.saturating_sub(page_no));
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let size = u64::from(request.page_size);
        let start = u64::from(page_no - 1) * size;
        let end = (start + size).min(self.total);
        let records: Vec<AuctionRecord> = (start..end).map(|i| listing(i + 1)).collect();
        self.served.lock().unwrap().push((page_no, records.len()));
        Ok(records)
    }
}

fn config(base: &Path, page_size: u32, chunk_size: usize, workers: usize) -> CollectorConfig {
    CollectorConfig {
        base_dir: base.to_path_buf(),
        disposal_method: "0001".to_string(),
        items_per_page: page_size,
        chunk_size,
        workers,
        retry: RetryPolicy::immediate(3),
    }
}

fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with(prefix))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

fn sequence(records: &[AuctionRecord]) -> Vec<u64> {
    records
        .iter()
        .map(|r| r.value("순번").parse().unwrap())
        .collect()
}

async fn never() {
    std::future::pending::<()>().await
}

#[tokio::test]
async fn three_pages_one_final_chunk() {
    let tmp = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::with_total(250));
    let collector = Collector::new(source.clone(), config(tmp.path(), 100, 1000, 4))
        .await
        .unwrap();

    let summary = collector.run_until(never()).await.unwrap();

    assert_eq!(summary.total_pages, 3);
    assert_eq!(source.served(), vec![(1, 100), (2, 100), (3, 50)]);
    assert_eq!(summary.records.len(), 250);
    assert_eq!(summary.unflushed, 0);

    let chunks = files_with_prefix(collector.data_dir(), "kamco_auction_chunk_");
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("kamco_auction_chunk_1_of_1_"));
    assert_eq!(read_records(&chunks[0]).unwrap().len(), 250);

    let full = files_with_prefix(collector.backup_dir(), "kamco_auction_full_250_");
    assert_eq!(full.len(), 1);
    assert_eq!(summary.final_snapshot.as_ref(), Some(&full[0]));
    assert_eq!(read_records(&full[0]).unwrap(), summary.records);
    assert!(files_with_prefix(collector.backup_dir(), "kamco_auction_backup_").is_empty());
}

#[tokio::test]
async fn interruption_saves_collected_records_only() {
    let tmp = tempfile::tempdir().unwrap();
    let (tx, rx) = oneshot::channel();
    let source = Arc::new(ScriptedSource {
        total: 300,
        interrupt: Mutex::new(Some((3, tx))),
        ..Default::default()
    });
    // One worker: page 3 starts only after page 2 has been absorbed.
    let collector = Collector::new(source, config(tmp.path(), 60, 1000, 1))
        .await
        .unwrap();

    let shutdown = async move {
        let _ = rx.await;
    };
    let err = collector.run_until(shutdown).await.unwrap_err();
    assert_eq!(err, AppError::Interrupted);

    let interrupted = files_with_prefix(collector.backup_dir(), "kamco_auction_interrupted_");
    assert_eq!(interrupted.len(), 1);
    assert!(interrupted[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("kamco_auction_interrupted_120_"));
    assert_eq!(sequence(&read_records(&interrupted[0]).unwrap()), (1..=120).collect::<Vec<_>>());
    assert!(files_with_prefix(collector.backup_dir(), "kamco_auction_full_").is_empty());
}

#[tokio::test]
async fn exhausted_page_is_skipped_and_run_completes() {
    let tmp = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource {
        total: 250,
        failing_pages: HashSet::from([2]),
        ..Default::default()
    });
    let collector = Collector::new(source.clone(), config(tmp.path(), 100, 1000, 4))
        .await
        .unwrap();

    let summary = collector.run_until(never()).await.unwrap();

    assert_eq!(source.attempts_for(2), 3);
    assert_eq!(source.attempts_for(1), 1);
    assert_eq!(summary.records.len(), 150);
    assert_eq!(
        sequence(&summary.records),
        (1..=100).chain(201..=250).collect::<Vec<_>>()
    );
    let pages = summary.stats.category(CAT_PAGE_FETCH);
    assert_eq!((pages.ok, pages.fail, pages.total_tasks), (2, 1, 3));
    assert_eq!(
        files_with_prefix(collector.backup_dir(), "kamco_auction_full_150_").len(),
        1
    );
}

#[tokio::test]
async fn count_failure_aborts_without_output() {
    let tmp = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource {
        count_fails: true,
        ..Default::default()
    });
    let collector = Collector::new(source.clone(), config(tmp.path(), 100, 1000, 4))
        .await
        .unwrap();

    let err = collector.run_until(never()).await.unwrap_err();
    assert!(matches!(err, AppError::Fatal(_)));
    assert!(source.requests.lock().unwrap().is_empty());
    assert!(files_with_prefix(collector.backup_dir(), "kamco_auction_").is_empty());
    assert!(files_with_prefix(collector.data_dir(), "kamco_auction_").is_empty());
}

#[tokio::test]
async fn chunks_flush_at_threshold_and_remainder_at_end() {
    let tmp = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::with_total(50));
    // Pages of 10 against a threshold of 30: 20 pending does not flush, 30 does.
    let collector = Collector::new(source, config(tmp.path(), 10, 30, 4))
        .await
        .unwrap();

    let summary = collector.run_until(never()).await.unwrap();

    let sizes: Vec<usize> = summary.chunk_files.iter().map(|(_, n)| *n).collect();
    assert_eq!(sizes, vec![30, 20]);
    assert!(summary.chunk_files[0]
        .0
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("kamco_auction_chunk_1_of_2_"));
    assert_eq!(summary.unflushed, 0);

    let merged = merge_chunk_files_blocking(collector.data_dir()).unwrap();
    assert_eq!(merged, summary.records);
}

#[tokio::test]
async fn backups_follow_five_chunk_boundaries() {
    let tmp = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::with_total(120));
    let collector = Collector::new(source, config(tmp.path(), 20, 10, 4))
        .await
        .unwrap();

    let summary = collector.run_until(never()).await.unwrap();

    // Totals 20..120 in steps of 20 cross 50 (at 60) and 100 (at 100).
    let backups = files_with_prefix(collector.backup_dir(), "kamco_auction_backup_");
    assert_eq!(backups.len(), 2);
    let mut backup_sizes: Vec<usize> = backups
        .iter()
        .map(|p| read_records(p).unwrap().len())
        .collect();
    backup_sizes.sort();
    assert_eq!(backup_sizes, vec![60, 100]);

    let chunked: usize = summary.chunk_files.iter().map(|(_, n)| n).sum();
    let full = files_with_prefix(collector.backup_dir(), "kamco_auction_full_");
    assert_eq!(chunked + summary.unflushed, read_records(&full[0]).unwrap().len());
    assert_eq!(summary.chunk_files.len(), 6);
}

#[tokio::test]
async fn failed_backup_is_logged_and_run_completes() {
    let tmp = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::with_total(120));
    let collector = Collector::new(source, config(tmp.path(), 20, 10, 4))
        .await
        .unwrap();

    // Directories squatting on every backup name the run could pick.
    let now = chrono::Local::now();
    for offset in -2..120 {
        let ts = (now + chrono::Duration::seconds(offset))
            .format(auction_collect::config::TIMESTAMP_FORMAT)
            .to_string();
        for count in [60, 100] {
            let name = snapshot_file_name(SnapshotKind::Backup, count, &ts);
            std::fs::create_dir(collector.backup_dir().join(name)).unwrap();
        }
    }

    let summary = collector.run_until(never()).await.unwrap();

    let snapshots = summary.stats.category(CAT_SNAPSHOT_SAVE);
    assert_eq!(snapshots.fail, 2);
    assert_eq!(snapshots.ok, 1);
    assert_eq!(summary.chunk_files.len(), 6);
    let full = summary.final_snapshot.expect("final snapshot");
    assert_eq!(read_records(&full).unwrap().len(), 120);
}

#[tokio::test]
async fn failed_chunk_flush_keeps_records_for_final_snapshot() {
    let tmp = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::with_total(250));
    let collector = Collector::new(source, config(tmp.path(), 100, 100, 4))
        .await
        .unwrap();
    std::fs::remove_dir_all(collector.data_dir()).unwrap();

    let summary = collector.run_until(never()).await.unwrap();

    assert!(summary.chunk_files.is_empty());
    assert_eq!(summary.unflushed, 250);
    // One attempt per page arrival plus the end-of-run flush.
    assert_eq!(summary.stats.category(CAT_CHUNK_SAVE).fail, 4);

    let full = summary.final_snapshot.expect("final snapshot");
    assert_eq!(read_records(&full).unwrap().len(), 250);
}

#[tokio::test]
async fn worker_crash_writes_error_snapshot() {
    let tmp = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource {
        total: 300,
        panicking_pages: HashSet::from([2]),
        ..Default::default()
    });
    let collector = Collector::new(source, config(tmp.path(), 100, 1000, 2))
        .await
        .unwrap();

    let err = collector.run_until(never()).await.unwrap_err();
    assert!(matches!(err, AppError::Join(_)));

    let snapshots = files_with_prefix(collector.backup_dir(), "kamco_auction_error_");
    assert_eq!(snapshots.len(), 1);
    assert_eq!(read_records(&snapshots[0]).unwrap().len(), 100);
    assert!(files_with_prefix(collector.backup_dir(), "kamco_auction_full_").is_empty());
}

#[tokio::test]
async fn slow_early_pages_still_arrive_first() {
    let tmp = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource {
        total: 80,
        stagger_ms: 5,
        ..Default::default()
    });
    let collector = Collector::new(source, config(tmp.path(), 10, 1000, 4))
        .await
        .unwrap();

    let summary = collector.run_until(never()).await.unwrap();
    assert_eq!(sequence(&summary.records), (1..=80).collect::<Vec<_>>());
}

#[tokio::test]
async fn empty_result_set_writes_no_snapshot() {
    let tmp = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::with_total(0));
    let collector = Collector::new(source, config(tmp.path(), 100, 1000, 4))
        .await
        .unwrap();

    let summary = collector.run_until(never()).await.unwrap();
    assert_eq!(summary.total_pages, 0);
    assert!(summary.records.is_empty());
    assert!(summary.final_snapshot.is_none());
}
