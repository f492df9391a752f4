pub mod merge;
pub mod xlsx;

use crate::config;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::model::AuctionRecord;
use crate::utils;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Full-history output files, told apart by their filename prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Backup,
    Interrupted,
    Error,
    Full,
    Merged,
}

impl SnapshotKind {
    pub fn label(self) -> &'static str {
        match self {
            SnapshotKind::Backup => "backup",
            SnapshotKind::Interrupted => "interrupted",
            SnapshotKind::Error => "error",
            SnapshotKind::Full => "full",
            SnapshotKind::Merged => "merged",
        }
    }

    pub fn file_prefix(self) -> String {
        format!("{}_{}_", config::FILE_PREFIX, self.label())
    }
}

pub fn snapshot_file_name(kind: SnapshotKind, record_count: usize, timestamp: &str) -> String {
    format!(
        "{}{}_{}.{}",
        kind.file_prefix(),
        record_count,
        timestamp,
        config::XLSX_EXT
    )
}

pub fn chunk_file_name(index: usize, total_chunks: usize, timestamp: &str) -> String {
    format!(
        "{}{}_of_{}_{}.{}",
        config::CHUNK_PREFIX,
        index,
        total_chunks,
        timestamp,
        config::XLSX_EXT
    )
}

pub async fn ensure_output_directories(backup_dir: &Path, data_dir: &Path) -> AppResult<()> {
    for dir in [backup_dir, data_dir] {
        if fs::try_exists(dir).await.unwrap_or(false) {
            continue;
        }
        fs::create_dir_all(dir)
            .await
            .map_err(|e| map_io_error(e, dir))?;
        log(
            LogLevel::Info,
            &format!("Created output directory: {}", dir.display()),
        );
    }
    Ok(())
}

pub(crate) fn map_io_error(error: std::io::Error, path: &Path) -> AppError {
    AppError::Io(format!("I/O error at path '{}': {}", path.display(), error))
}

/// Writes `records` to `fpath` on the blocking pool.
///
/// Failures are logged with `log_ctx` and returned; a partially written
/// file is removed.
pub async fn save_records(
    fpath: PathBuf,
    records: Vec<AuctionRecord>,
    log_ctx: String,
) -> AppResult<()> {
    let count = records.len();
    let target = fpath.clone();
    let result = utils::run_blocking(move || xlsx::write_records(&records, &target)).await;

    match result {
        Ok(()) => {
            log(
                LogLevel::Success,
                &format!(
                    "Saved {} ({} records): {}",
                    log_ctx,
                    count,
                    fpath.display()
                ),
            );
            Ok(())
        }
        Err(e) => {
            log(
                LogLevel::Error,
                &format!(
                    "Save {} FAIL: {}. File: '{}'",
                    log_ctx,
                    e,
                    fpath.display()
                ),
            );

            if count > 0 && fs::try_exists(&fpath).await.unwrap_or(false) {
                let _ = fs::remove_file(&fpath).await;
            }

            Err(e)
        }
    }
}
