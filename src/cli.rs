use crate::config::{self, CollectorConfig, RetryPolicy};
use crate::error::AppResult;
use crate::logging::{log, LogLevel};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Collects public-sale auction listings into spreadsheet files.",
    long_about = None,
    after_help = format!(
        "The API key is read from {} (environment or .env file).",
        config::SERVICE_KEY_ENV
    )
)]
pub struct CliArgs {
    #[arg(
        long,
        default_value = config::DEFAULT_BASE_DIR,
        value_name = "DIR_PATH",
        help = "Directory under which backup/ and backup/data/ are created"
    )]
    base_dir: String,

    #[arg(
        long,
        default_value = config::DEFAULT_DISPOSAL_METHOD,
        value_name = "CODE",
        help = "Disposal method code (DPSL_MTD_CD) to collect"
    )]
    disposal_method: String,

    #[arg(
        long,
        default_value_t = config::DEFAULT_PAGE_SIZE,
        value_name = "ROWS",
        help = "Listings requested per page"
    )]
    page_size: u32,

    #[arg(
        long,
        default_value_t = config::DEFAULT_CHUNK_SIZE,
        value_name = "RECORDS",
        help = "Records per chunk file; a full backup is written every 5 chunks"
    )]
    chunk_size: usize,

    #[arg(
        long,
        value_name = "N",
        help = "Concurrent page fetches, 1 to 4 (default: min(4, CPU count))"
    )]
    workers: Option<usize>,

    #[arg(
        long,
        help = "Merge existing chunk files into one snapshot instead of collecting",
        conflicts_with = "parse_file"
    )]
    merge_chunks: bool,

    #[arg(
        long,
        value_name = "XML_PATH",
        help = "Offline mode: convert a saved API response file into a spreadsheet"
    )]
    parse_file: Option<String>,

    #[arg(
        long,
        default_value = "parsed_page.xlsx",
        value_name = "OUTPUT_FILE",
        help = "Output file name for offline mode",
        requires = "parse_file"
    )]
    parse_output: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Collect,
    MergeChunks,
    ParseFile { input: PathBuf, output: PathBuf },
}

impl CliArgs {
    pub fn mode(&self) -> RunMode {
        if let Some(input) = self.parse_file.as_deref() {
            RunMode::ParseFile {
                input: PathBuf::from(input),
                output: PathBuf::from(&self.parse_output),
            }
        } else if self.merge_chunks {
            RunMode::MergeChunks
        } else {
            RunMode::Collect
        }
    }

    pub fn collector_config(&self) -> AppResult<CollectorConfig> {
        let workers = match self.workers {
            Some(n) if n > config::MAX_WORKERS => {
                log(
                    LogLevel::Warning,
                    &format!(
                        "Requested {} workers; the API tolerates at most {}. Using {}.",
                        n,
                        config::MAX_WORKERS,
                        config::MAX_WORKERS
                    ),
                );
                config::MAX_WORKERS
            }
            Some(n) => n,
            None => config::default_workers(),
        };

        let cfg = CollectorConfig {
            base_dir: PathBuf::from(&self.base_dir),
            disposal_method: self.disposal_method.trim().to_string(),
            items_per_page: self.page_size,
            chunk_size: self.chunk_size,
            workers,
            retry: RetryPolicy::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}
