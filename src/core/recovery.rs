use crate::config::CollectorConfig;
use crate::error::AppResult;
use crate::io::{self, merge, SnapshotKind};
use crate::logging::{log, LogLevel};
use crate::utils;
use std::path::PathBuf;

/// Rebuilds one dataset from the chunk files of earlier runs and saves it as
/// a merged snapshot. Returns the snapshot path, or `None` when no chunk
/// held any records.
pub async fn merge_and_save(config: &CollectorConfig) -> AppResult<Option<PathBuf>> {
    let backup_dir = config.backup_dir();
    let data_dir = config.data_dir();
    io::ensure_output_directories(&backup_dir, &data_dir).await?;

    log(
        LogLevel::Step,
        &format!("Merging chunk files from {}", data_dir.display()),
    );
    let records = merge::merge_chunk_files(data_dir).await?;

    if records.is_empty() {
        log(LogLevel::Warning, "No chunk records found to merge.");
        return Ok(None);
    }

    let path = backup_dir.join(io::snapshot_file_name(
        SnapshotKind::Merged,
        records.len(),
        &utils::file_timestamp(),
    ));
    io::save_records(path.clone(), records, "merged snapshot".to_string()).await?;
    Ok(Some(path))
}
