use crate::config;
use crate::error::{AppError, AppResult};
use crate::io::map_io_error;
use crate::logging::{log, LogLevel};
use crate::model::AuctionRecord;
use crate::utils;
use calamine::{open_workbook, Data, Reader, Xlsx};
use std::path::{Path, PathBuf};

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Loads one spreadsheet written by `xlsx::write_records` back into records.
pub fn read_records(path: &Path) -> AppResult<Vec<AuctionRecord>> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e: calamine::XlsxError| AppError::Read(format!("{}: {}", path.display(), e)))?;
    let range = workbook.worksheet_range(config::SHEET_NAME)?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(cell_text).collect(),
        None => return Ok(Vec::new()),
    };

    Ok(rows
        .map(|row| {
            AuctionRecord::from_pairs(
                headers
                    .iter()
                    .zip(row.iter())
                    .filter(|(header, _)| !header.is_empty())
                    .map(|(header, cell)| (header.clone(), cell_text(cell))),
            )
        })
        .collect())
}

/// Chunk files in `data_dir`, ordered by chunk index, then by file name.
pub fn find_chunk_files(data_dir: &Path) -> AppResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(data_dir).map_err(|e| map_io_error(e, data_dir))?;

    let mut chunks: Vec<(u64, String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| map_io_error(e, data_dir))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(caps) = config::CHUNK_FILE_RE.captures(&name) {
            let index = caps[1].parse::<u64>().unwrap_or(u64::MAX);
            chunks.push((index, name, entry.path()));
        }
    }

    chunks.sort();
    Ok(chunks.into_iter().map(|(_, _, path)| path).collect())
}

/// Concatenates every chunk file under `data_dir`.
///
/// A file that cannot be read is logged and skipped.
pub fn merge_chunk_files_blocking(data_dir: &Path) -> AppResult<Vec<AuctionRecord>> {
    let files = find_chunk_files(data_dir)?;
    log(
        LogLevel::Info,
        &format!("Chunk files to merge: {}", files.len()),
    );

    let mut merged = Vec::new();
    let mut skipped = 0usize;
    for file in &files {
        match read_records(file) {
            Ok(records) => {
                log(
                    LogLevel::Info,
                    &format!("Merged {} ({} records)", file.display(), records.len()),
                );
                merged.extend(records);
            }
            Err(e) => {
                skipped += 1;
                log(
                    LogLevel::Warning,
                    &format!("Skipping unreadable chunk {}: {}", file.display(), e),
                );
            }
        }
    }

    if skipped > 0 {
        log(
            LogLevel::Warning,
            &format!("{} chunk file(s) could not be merged.", skipped),
        );
    }

    Ok(merged)
}

pub async fn merge_chunk_files(data_dir: PathBuf) -> AppResult<Vec<AuctionRecord>> {
    utils::run_blocking(move || merge_chunk_files_blocking(&data_dir)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{chunk_file_name, xlsx::write_records};
    use crate::transform::map_record;
    use crate::api::model::RawItem;

    fn records(range: std::ops::Range<usize>) -> Vec<AuctionRecord> {
        range
            .map(|i| {
                map_record(&RawItem::from([
                    ("RNUM".to_string(), i.to_string()),
                    ("CLTR_NM".to_string(), format!("물건 {}", i)),
                    ("MIN_BID_PRC".to_string(), (i * 1000).to_string()),
                ]))
            })
            .collect()
    }

    #[test]
    fn split_then_merge_reproduces_records() {
        let tmp = tempfile::tempdir().unwrap();
        let all = records(1..26);

        // Chunk 10 sorts after chunk 2 by index, not by name.
        let indices = [1usize, 2, 10];
        for (chunk, index) in all.chunks(10).zip(indices) {
            let name = chunk_file_name(index, 3, "20241001_101530");
            write_records(chunk, &tmp.path().join(name)).unwrap();
        }
        std::fs::write(tmp.path().join("notes.txt"), "not a chunk").unwrap();

        let merged = merge_chunk_files_blocking(tmp.path()).unwrap();
        assert_eq!(merged, all);
    }

    #[test]
    fn unreadable_chunk_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let good = records(1..4);
        write_records(&good, &tmp.path().join(chunk_file_name(1, 2, "20241001_101530"))).unwrap();
        std::fs::write(
            tmp.path().join(chunk_file_name(2, 2, "20241001_101530")),
            b"not a zip archive",
        )
        .unwrap();

        let merged = merge_chunk_files_blocking(tmp.path()).unwrap();
        assert_eq!(merged, good);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = find_chunk_files(&tmp.path().join("absent"));
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
