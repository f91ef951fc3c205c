//! # Vandal Shorts
//!
//! A content pipeline that scrapes recent videogame news from Vandal,
//! turns each story into short-form social-media content (caption, title,
//! description, featured image), and lays the results out in dated,
//! versioned batch directories.
//!
//! ## Usage
//!
//! ```sh
//! vandal_shorts -o ./gaming_news_output -n 5
//! ```
//!
//! ## Architecture
//!
//! One run is a sequential pipeline:
//! 1. **Listing**: fetch the news listing and extract candidate articles
//! 2. **Filtering**: drop articles already in the history file, cap at the
//!    configured count, fall back to reprocessing when everything was seen
//! 3. **Processing**: per article, fetch → extract → generate → write files
//!    → download the image, each failure isolated to its article
//! 4. **Persisting**: update the history with the successful ids and write
//!    the batch manifest plus the consolidated captions file
//!
//! The process exits non-zero only when the run reaches the pipeline's
//! failed state (listing unavailable, or zero articles even after the
//! fallback); partial per-article failures are a successful, degraded run.

use clap::Parser;
use std::error::Error;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod content;
mod debug;
mod fetch;
mod history;
mod image;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;
use config::AppConfig;
use debug::FsDebugSink;
use fetch::Fetcher;
use history::HistoryStore;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(output_root) = args.output_root {
        config.output_root = output_root;
    }
    if let Some(news_count) = args.news_count {
        config.news_count = news_count;
    }

    // --- Tracing init: stdout plus a date-keyed file under logs/ ---
    // Only the log directory is created up front; everything else is checked
    // after the subscriber exists so those events are not lost.
    std::fs::create_dir_all(config.logs_dir())?;
    let file_appender = tracing_appender::rolling::daily(config.logs_dir(), "run.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stdout.and(file_writer))
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "vandal_shorts starting up");
    info!(
        config_file = ?args.config,
        news_count = config.news_count,
        history_limit = config.history_limit,
        output_root = %config.output_root.display(),
        listing_url = %config.listing_url(),
        "Configuration active"
    );

    ensure_writable_dir(&config.output_root)?;
    ensure_writable_dir(&config.content_dir())?;
    ensure_writable_dir(&config.logs_dir())?;
    ensure_writable_dir(&config.debug_dir())?;

    let fetcher = Fetcher::new(
        config.request_timeout(),
        config.max_retries,
        config.backoff_base(),
    )?;
    let mut history = HistoryStore::load(&config.history_file(), config.history_limit);
    let debug_sink = FsDebugSink::new(config.debug_dir());

    match pipeline::run(&config, &fetcher, &mut history, &debug_sink).await {
        Ok(report) => {
            let elapsed = start_time.elapsed();
            info!(
                processed = report.processed,
                failed = report.failed,
                skipped_seen = report.skipped_seen,
                fallback_used = report.fallback_used,
                batch = %report.batch_dir.display(),
                secs = elapsed.as_secs(),
                "Run complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            Err(e.into())
        }
    }
}
