//! CLI entry point for the polite range downloader.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use politedl_core::{
    HttpFetcher, IndexLabel, RunEngine, RunError, RunReport, SourceLayout, TaskRange, TokioPause,
};
use tracing::{debug, error, info, warn};

mod cli;

use cli::Args;

/// Exit code for a startup error (bad URL, bad range, unwritable folder).
const EXIT_STARTUP_ERROR: u8 = 1;

/// Exit code when the run stopped after too many consecutive failures.
const EXIT_THRESHOLD_ABORT: u8 = 3;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(&args);
    debug!(?args, "CLI arguments parsed");

    let (range, engine) = match prepare(&args).await {
        Ok(prepared) => prepared,
        Err(e) => {
            error!("[ERROR] {e:#}");
            return ExitCode::from(EXIT_STARTUP_ERROR);
        }
    };

    match engine.run(&range).await {
        Ok(report) => {
            log_summary(&report);
            info!("Done.");
            ExitCode::SUCCESS
        }
        Err(RunError::ThresholdAbort {
            consecutive_failures,
            report,
        }) => {
            log_summary(&report);
            warn!(consecutive_failures, "run aborted before the end of the range");
            ExitCode::from(EXIT_THRESHOLD_ABORT)
        }
    }
}

/// Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
fn init_tracing(args: &Args) {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Validates labels and link, creates the folder, and wires the engine.
async fn prepare(args: &Args) -> Result<(TaskRange, RunEngine)> {
    let start = IndexLabel::parse(&args.start).context("invalid --start")?;
    let end = IndexLabel::parse(args.end_label()).context("invalid --end")?;
    let layout = SourceLayout::from_sample_url(&args.url, &args.output_dir, &args.ext)?;
    let range = TaskRange::new(&start, &end, layout)?;

    create_folder(range.layout().folder()).await?;

    let fetcher = HttpFetcher::new(&args.fetch_settings())?;
    let engine = RunEngine::new(
        args.policy(),
        args.max_errors,
        Arc::new(fetcher),
        Arc::new(TokioPause),
    );

    info!(
        base = range.layout().base_url(),
        folder = %range.layout().folder().display(),
        start = %args.start,
        end = %args.end_label(),
        pad = range.pad(),
        interval_secs = args.interval,
        jitter_pct = (args.jitter * 100.0).round(),
        "starting run"
    );

    Ok((range, engine))
}

async fn create_folder(folder: &Path) -> Result<()> {
    tokio::fs::create_dir_all(folder)
        .await
        .with_context(|| format!("cannot create folder {}", folder.display()))
}

fn log_summary(report: &RunReport) {
    info!(
        downloaded = report.downloaded,
        skipped = report.skipped,
        not_found = report.not_found,
        given_up = report.given_up,
        retries = report.retries,
        "summary"
    );
    if report.not_found > 0 {
        warn!(
            not_found = report.not_found,
            "some indices answered without a file (e.g. 404); the range may end earlier than requested"
        );
    }
}
