use crate::api::model::ApiEnvelope;
use crate::error::AppResult;
use crate::io;
use crate::logging::{log, LogLevel};
use crate::model::AuctionRecord;
use crate::transform;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Offline check of the parse → map → write path: reads a saved
/// `getPublicSaleObject` response and writes its items to `output_path`.
pub async fn parse_file_to_sheet(input_path: &Path, output_path: PathBuf) -> AppResult<usize> {
    log(LogLevel::Info, "--- Running Offline Page Parse ---");
    log(
        LogLevel::Info,
        &format!("Input file: {}", input_path.display()),
    );
    log(
        LogLevel::Info,
        &format!("Output file: {}", output_path.display()),
    );

    let xml = fs::read(input_path)
        .await
        .map_err(|e| io::map_io_error(e, input_path))?;

    let envelope = ApiEnvelope::parse(&xml)?.ensure_success()?;
    if let Ok(total) = envelope.total_count() {
        log(
            LogLevel::Info,
            &format!("Response reports totalCount={}", total),
        );
    }

    let records: Vec<AuctionRecord> = envelope.items.iter().map(transform::map_record).collect();
    let count = records.len();
    log(
        LogLevel::Info,
        &format!("Parsed {} item(s) from the response.", count),
    );

    if count == 0 {
        log(
            LogLevel::Warning,
            "Response contains no items. No file generated.",
        );
        return Ok(0);
    }

    io::save_records(output_path, records, "offline page".to_string()).await?;
    Ok(count)
}
