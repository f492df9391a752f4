use auction_collect::api::client::ApiClient;
use auction_collect::cli::{CliArgs, RunMode};
use auction_collect::config;
use auction_collect::core::{processor::Collector, recovery};
use auction_collect::error::{AppError, AppResult};
use auction_collect::logging::{log, setup_logging, LogLevel};
use auction_collect::testing;
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::runtime::Builder;

const EXIT_ARGUMENT: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        log(
            LogLevel::Warning,
            "Could not listen for Ctrl-C; interruption snapshots are disabled.",
        );
        std::future::pending::<()>().await;
    }
}

async fn run(args: CliArgs) -> AppResult<()> {
    match args.mode() {
        RunMode::ParseFile { input, output } => {
            if !input.exists() {
                log(
                    LogLevel::Error,
                    &format!("Input file not found: {}", input.display()),
                );
                return Err(AppError::Argument("Input file not found.".to_string()));
            }
            testing::parse_file_to_sheet(&input, output).await.map(|_| ())
        }
        RunMode::MergeChunks => {
            let cfg = args.collector_config()?;
            if let Some(path) = recovery::merge_and_save(&cfg).await? {
                log(
                    LogLevel::Success,
                    &format!("Merged snapshot written: {}", path.display()),
                );
            }
            Ok(())
        }
        RunMode::Collect => {
            let cfg = args.collector_config()?;
            let service_key = config::load_service_key()?;
            let client = Arc::new(ApiClient::new(service_key)?);
            let collector = Collector::new(client, cfg).await?;
            collector.run_until(shutdown_signal()).await.map(|_| ())
        }
    }
}

fn main() -> ExitCode {
    setup_logging();

    let cli_args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            log(LogLevel::Error, &format!("CLI Argument Error: {}", e));
            let _ = CliArgs::command().print_help();
            return ExitCode::from(EXIT_ARGUMENT);
        }
    };

    let runtime = match Builder::new_multi_thread()
        .enable_all()
        .thread_name("auction-worker")
        .worker_threads(num_cpus::get())
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log(
                LogLevel::Error,
                &format!("FATAL: Failed to build Tokio runtime: {}", e),
            );
            return ExitCode::FAILURE;
        }
    };

    log(LogLevel::Step, "Public-sale listing collector starting");

    match runtime.block_on(run(cli_args)) {
        Ok(()) => {
            log(LogLevel::Success, "Done.");
            ExitCode::SUCCESS
        }
        Err(AppError::Interrupted) => {
            log(LogLevel::Warning, "Stopped by user.");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(AppError::Argument(msg)) => {
            log(LogLevel::Error, &msg);
            ExitCode::from(EXIT_ARGUMENT)
        }
        Err(AppError::Config(msg)) => {
            log(LogLevel::Error, &msg);
            ExitCode::FAILURE
        }
        Err(e) => {
            log(LogLevel::Error, &format!("FATAL: {}", e));
            ExitCode::FAILURE
        }
    }
}
