//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use politedl_core::download::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_EXTENSION, DEFAULT_INTERVAL, DEFAULT_JITTER_FRAC,
    DEFAULT_MAX_ERRORS, DEFAULT_MAX_WAIT, DEFAULT_RETRIES, DEFAULT_TIMEOUT_SECS,
};
use politedl_core::user_agent::default_user_agent;
use politedl_core::{FetchSettings, PolitenessPolicy};

/// Politely fetch a zero-padded numeric range of remote files.
///
/// Give the link to any one file of the range and the labels to cover.
/// Files already on disk are skipped, every request is spaced and jittered,
/// and the run stops after too many consecutive failures.
#[derive(Parser, Debug)]
#[command(name = "politedl")]
#[command(author, version, about)]
pub struct Args {
    /// Full URL to any file of the range (e.g. https://host/book/0001.png)
    #[arg(short, long)]
    pub url: String,

    /// Start label as it appears in the file name, e.g. 0001 or 0064
    #[arg(short, long)]
    pub start: String,

    /// End label (0077 or 77); defaults to the start label
    #[arg(short, long)]
    pub end: Option<String>,

    /// Base interval in seconds between files
    #[arg(long, default_value_t = DEFAULT_INTERVAL.as_secs())]
    pub interval: u64,

    /// Random jitter fraction (0.2 = ±20%)
    #[arg(long, default_value_t = DEFAULT_JITTER_FRAC, value_parser = parse_fraction)]
    pub jitter: f64,

    /// Retries per file after a failed first attempt (0-100)
    #[arg(long, default_value_t = DEFAULT_RETRIES, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub retries: u32,

    /// HTTP timeout in seconds for one attempt
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Max backoff wait in seconds
    #[arg(long, default_value_t = DEFAULT_MAX_WAIT.as_secs())]
    pub max_wait: u64,

    /// Backoff multiplier for consecutive failed files (>= 1.0)
    #[arg(long, default_value_t = DEFAULT_BACKOFF_MULTIPLIER, value_parser = parse_multiplier)]
    pub backoff: f64,

    /// Stop after this many consecutive failed files
    #[arg(long, default_value_t = DEFAULT_MAX_ERRORS, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_errors: u32,

    /// File extension without dot
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    pub ext: String,

    /// User-Agent header
    #[arg(long, default_value_t = default_user_agent())]
    pub ua: String,

    /// Directory the range folder is created in
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress everything but the abort message and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// End label, falling back to the start label.
    #[must_use]
    pub fn end_label(&self) -> &str {
        self.end.as_deref().unwrap_or(&self.start)
    }

    /// Wait and retry policy from the flags.
    #[must_use]
    pub fn policy(&self) -> PolitenessPolicy {
        PolitenessPolicy::new(
            Duration::from_secs(self.interval),
            self.jitter,
            self.retries,
            Duration::from_secs(self.max_wait),
            self.backoff,
        )
    }

    /// HTTP client settings from the flags.
    #[must_use]
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            user_agent: self.ua.clone(),
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

fn parse_fraction(value: &str) -> Result<f64, String> {
    let frac: f64 = value.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&frac) {
        Ok(frac)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

fn parse_multiplier(value: &str) -> Result<f64, String> {
    let multiplier: f64 = value.parse().map_err(|e| format!("{e}"))?;
    if multiplier.is_finite() && multiplier >= 1.0 {
        Ok(multiplier)
    } else {
        Err(format!("{value} must be a finite number >= 1.0"))
    }
}
