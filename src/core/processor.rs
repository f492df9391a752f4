use crate::api::fetchers;
use crate::api::AuctionSource;
use crate::config::CollectorConfig;
use crate::core::run_state::CollectionState;
use crate::core::stats::{self, RunStats, CAT_CHUNK_SAVE, CAT_PAGE_FETCH, CAT_SNAPSHOT_SAVE};
use crate::error::{AppError, AppResult};
use crate::io::{self, SnapshotKind};
use crate::logging::{log, LogLevel};
use crate::model::{AuctionRecord, PageRequest};
use crate::utils;
use chrono::Local;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of a collection run that reached the last page.
#[derive(Debug)]
pub struct RunSummary {
    pub total_count: u64,
    pub total_pages: u32,
    pub records: Vec<AuctionRecord>,
    /// Chunk files written, with their record counts.
    pub chunk_files: Vec<(PathBuf, usize)>,
    /// Records whose chunk never reached disk.
    pub unflushed: usize,
    pub final_snapshot: Option<PathBuf>,
    pub stats: RunStats,
}

/// Drives one fetch-paginate-chunk-checkpoint run against `S`.
pub struct Collector<S: AuctionSource + 'static> {
    source: Arc<S>,
    config: CollectorConfig,
    backup_dir: PathBuf,
    data_dir: PathBuf,
}

struct PagePlan {
    total_pages: u32,
    total_chunks: usize,
}

impl<S: AuctionSource + 'static> Collector<S> {
    /// Validates `config` and creates the output directories.
    pub async fn new(source: Arc<S>, config: CollectorConfig) -> AppResult<Self> {
        config.validate()?;
        let backup_dir = config.backup_dir();
        let data_dir = config.data_dir();
        io::ensure_output_directories(&backup_dir, &data_dir).await?;
        Ok(Collector {
            source,
            config,
            backup_dir,
            data_dir,
        })
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Runs until every page is consumed or `shutdown` resolves.
    ///
    /// On shutdown or a loop failure the records gathered so far are written
    /// to an interrupted/error snapshot and the condition is returned. Once
    /// the last page is in, the final chunk and full snapshot are always
    /// completed; a shutdown during those writes is only logged.
    pub async fn run_until<F>(&self, shutdown: F) -> AppResult<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        let disposal_method = self.config.disposal_method.as_str();
        log(
            LogLevel::Step,
            &format!(
                "Starting collection for disposal method {} at {}",
                disposal_method,
                Local::now().format("%Y-%m-%d %H:%M:%S %Z")
            ),
        );

        let total_count = fetchers::fetch_total_count(&*self.source, disposal_method).await?;
        log(
            LogLevel::Info,
            &format!("Total listings reported: {}", total_count),
        );

        let plan = self.plan(total_count)?;
        let requests =
            PageRequest::plan(plan.total_pages, disposal_method, self.config.items_per_page);

        let mut stats = RunStats::new();
        stats
            .category_mut(CAT_PAGE_FETCH)
            .set_total(plan.total_pages as usize);
        let mut state = CollectionState::new(self.config.chunk_size, self.config.backup_interval());

        tokio::pin!(shutdown);
        let loop_result = self
            .collect_pages(requests, &plan, &mut state, &mut stats, shutdown.as_mut())
            .await;

        if let Err(e) = loop_result {
            let kind = if e.is_interrupted() {
                log(
                    LogLevel::Warning,
                    "Interrupted. Saving the records collected so far...",
                );
                SnapshotKind::Interrupted
            } else {
                log(
                    LogLevel::Error,
                    &format!("Collection failed: {}. Saving the records collected so far...", e),
                );
                SnapshotKind::Error
            };
            self.save_emergency_snapshot(kind, &state, &mut stats).await;
            stats::print_summary(
                &stats,
                disposal_method,
                state.accumulated().len(),
                started.elapsed(),
            );
            return Err(e);
        }

        let (final_snapshot, interrupted) = utils::complete_watching(
            self.finish(&mut state, plan.total_chunks, &mut stats),
            shutdown.as_mut(),
        )
        .await;
        if interrupted {
            log(
                LogLevel::Warning,
                "Interrupt received while writing the final files; they were completed.",
            );
        }

        log(
            LogLevel::Success,
            &format!("Collected {} record(s) in total.", state.accumulated().len()),
        );
        stats::print_summary(
            &stats,
            disposal_method,
            state.accumulated().len(),
            started.elapsed(),
        );

        Ok(RunSummary {
            total_count,
            total_pages: plan.total_pages,
            chunk_files: state.chunk_files().to_vec(),
            unflushed: state.pending().len(),
            final_snapshot,
            stats,
            records: state.into_records(),
        })
    }

    /// Flushes the remaining chunk and writes the full snapshot.
    async fn finish(
        &self,
        state: &mut CollectionState,
        total_chunks: usize,
        stats: &mut RunStats,
    ) -> Option<PathBuf> {
        if state.has_pending() {
            self.flush_chunk(state, total_chunks, stats).await;
        }

        if state.accumulated().is_empty() {
            log(
                LogLevel::Warning,
                "No records collected; skipping the final snapshot.",
            );
            return None;
        }
        self.save_snapshot(SnapshotKind::Full, state.accumulated(), stats)
            .await
            .ok()
    }

    fn plan(&self, total_count: u64) -> AppResult<PagePlan> {
        let total = usize::try_from(total_count)
            .map_err(|_| AppError::Fatal(format!("total count {} is too large", total_count)))?;
        let pages = utils::div_ceil(total, self.config.items_per_page as usize);
        let total_pages = u32::try_from(pages)
            .map_err(|_| AppError::Fatal(format!("page count {} is too large", pages)))?;
        Ok(PagePlan {
            total_pages,
            total_chunks: utils::div_ceil(total, self.config.chunk_size),
        })
    }

    async fn collect_pages<F>(
        &self,
        requests: Vec<PageRequest>,
        plan: &PagePlan,
        state: &mut CollectionState,
        stats: &mut RunStats,
        mut shutdown: Pin<&mut F>,
    ) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        let workers = self.config.effective_workers();
        log(
            LogLevel::Info,
            &format!(
                "Fetching {} page(s) with {} worker(s)...",
                plan.total_pages, workers
            ),
        );

        let source = self.source.clone();
        let policy = self.config.retry;
        let mut results = stream::iter(requests)
            .map(move |request| {
                let source = source.clone();
                tokio::spawn(async move {
                    fetchers::fetch_page_resilient(&*source, &request, &policy).await
                })
            })
            .buffered(workers);

        let total_pages = plan.total_pages as usize;
        let log_interval = (total_pages / 20).max(1);
        let mut processed = 0usize;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.as_mut() => return Err(AppError::Interrupted),
                next = results.next() => {
                    let Some(joined) = next else { break };
                    let page = joined?;
                    processed += 1;
                    stats.record_page(page.status);

                    let crossed_backup = state.absorb(page.records);

                    if state.chunk_ready() {
                        self.flush_chunk(state, plan.total_chunks, stats).await;
                    }
                    if crossed_backup {
                        if let Err(e) = self
                            .save_snapshot(SnapshotKind::Backup, state.accumulated(), stats)
                            .await
                        {
                            log(
                                LogLevel::Warning,
                                &format!("Backup snapshot not saved ({}); continuing.", e),
                            );
                        }
                    }

                    if processed % log_interval == 0 || processed == total_pages {
                        log(
                            LogLevel::Info,
                            &format!(
                                "Progress: page {}/{} - {} record(s) collected",
                                processed,
                                total_pages,
                                state.accumulated().len()
                            ),
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Writes the pending chunk. On failure the chunk stays pending.
    async fn flush_chunk(
        &self,
        state: &mut CollectionState,
        total_chunks: usize,
        stats: &mut RunStats,
    ) {
        let index = state.next_chunk_index();
        let path = self.data_dir.join(io::chunk_file_name(
            index,
            total_chunks,
            &utils::file_timestamp(),
        ));
        let log_ctx = format!("chunk {}/{}", index, total_chunks);

        match io::save_records(path.clone(), state.pending().to_vec(), log_ctx).await {
            Ok(()) => {
                state.mark_chunk_flushed(path);
                stats.record_save(CAT_CHUNK_SAVE, true);
            }
            Err(e) => {
                log(
                    LogLevel::Warning,
                    &format!(
                        "Chunk {} not saved ({}); keeping {} record(s) pending.",
                        index,
                        e,
                        state.pending().len()
                    ),
                );
                stats.record_save(CAT_CHUNK_SAVE, false);
            }
        }
    }

    async fn save_snapshot(
        &self,
        kind: SnapshotKind,
        records: &[AuctionRecord],
        stats: &mut RunStats,
    ) -> AppResult<PathBuf> {
        let path = self.backup_dir.join(io::snapshot_file_name(
            kind,
            records.len(),
            &utils::file_timestamp(),
        ));
        let log_ctx = format!("{} snapshot", kind.label());
        let result = io::save_records(path.clone(), records.to_vec(), log_ctx).await;
        stats.record_save(CAT_SNAPSHOT_SAVE, result.is_ok());
        result.map(|_| path)
    }

    async fn save_emergency_snapshot(
        &self,
        kind: SnapshotKind,
        state: &CollectionState,
        stats: &mut RunStats,
    ) {
        if state.accumulated().is_empty() {
            log(LogLevel::Info, "Nothing collected yet; no snapshot written.");
            return;
        }
        if let Err(e) = self.save_snapshot(kind, state.accumulated(), stats).await {
            log(
                LogLevel::Error,
                &format!("Could not save {} snapshot: {}", kind.label(), e),
            );
        }
    }
}
