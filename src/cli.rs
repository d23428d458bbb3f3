//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use bricks_core::DEFAULT_CONCURRENCY;

/// Download every file in a shared remote directory.
///
/// The directory structure is recreated under the destination path and
/// files are fetched with a bounded number of parallel downloads.
#[derive(Parser, Debug)]
#[command(name = "bricks")]
#[command(author, version, about)]
pub struct Args {
    /// Share link of the directory to download (prompted for when omitted)
    #[arg(long)]
    pub url: Option<String>,

    /// Existing directory to download into
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Parallel file downloads (1-5)
    #[arg(short = 'n', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub parallel: u8,

    /// Extra attempts per file for transient failures (0-10)
    #[arg(short = 'r', long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Download files again even when already present with the same size
    #[arg(long)]
    pub overwrite: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
