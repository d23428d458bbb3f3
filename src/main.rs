//! CLI entry point for the bricks downloader.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use bricks_core::{
    Downloader, DownloaderConfig, DownloaderError, RetryPolicy, ShareLink, parse_share_link,
    resolve_destination,
};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

mod cli;

use cli::Args;

/// Exit status when the run finished with failures or was cancelled.
const EXIT_INCOMPLETE: u8 = 2;

fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
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

    // Logs go to stderr; stdout carries the URL prompt.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    // Read before the runtime starts: Ctrl-C at the prompt ends the process.
    let raw_url = match args.url.clone() {
        Some(url) => url,
        None => prompt_url()?,
    };
    let link = parse_share_link(&raw_url)?;
    let destination = resolve_destination(&args.path)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(run(&args, &link, &destination))
}

/// Runs the download and maps the outcome to an exit status.
async fn run(args: &Args, link: &ShareLink, destination: &Path) -> Result<ExitCode> {
    info!(
        base = %link.base_url,
        directory = %link.directory_id,
        destination = %destination.display(),
        "bricks starting"
    );

    let config = DownloaderConfig::default()
        .with_job_retry(RetryPolicy::with_max_attempts(u32::from(args.max_retries) + 1))
        .with_skip_existing(!args.overwrite);
    let downloader = Downloader::new(&link.base_url, config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling downloads");
            on_interrupt.cancel();
        }
    });

    let summary = match downloader
        .run_with_cancel(
            &link.directory_id,
            destination,
            usize::from(args.parallel),
            cancel,
        )
        .await
    {
        Ok(summary) => summary,
        Err(DownloaderError::Cancelled { phase }) => {
            warn!(%phase, "cancelled before downloading");
            return Ok(ExitCode::from(EXIT_INCOMPLETE));
        }
        Err(e) => return Err(e.into()),
    };

    for failure in summary.failures() {
        error!(
            path = %failure.job.destination.display(),
            reason = %failure.reason,
            "download failed"
        );
    }
    for unlisted in summary.unlisted() {
        warn!(
            path = %unlisted.path.display(),
            reason = %unlisted.reason,
            "directory not listed"
        );
    }
    for skipped in summary.skipped() {
        debug!(
            path = %skipped.job.destination.display(),
            reason = %skipped.reason,
            "download skipped"
        );
    }

    info!(
        succeeded = summary.succeeded(),
        failed = summary.failed_count(),
        skipped = summary.skipped_count(),
        total = summary.total_jobs(),
        bytes = summary.bytes_transferred(),
        "{summary}"
    );

    if summary.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_INCOMPLETE))
    }
}

/// Asks for the share link on stdin.
fn prompt_url() -> Result<String> {
    print!("Enter URL: ");
    io::stdout().flush().context("failed to write prompt")?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read URL from stdin")?;
    if read == 0 || line.trim().is_empty() {
        bail!("no URL provided");
    }
    Ok(line)
}
