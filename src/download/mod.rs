//! Polite, sequential fetching of a file range.
//!
//! This module holds the whole run: one-attempt fetching with atomic
//! publication, the politeness scheduler that decides every wait and retry,
//! the consecutive-failure tracker, and the engine that drives them.
//!
//! # Features
//!
//! - Streaming downloads published via `.part` file and rename
//! - `Retry-After` support (delta-seconds and HTTP-date)
//! - Exponential backoff across consecutive failed files, flat within a file
//! - Jitter on every wait
//! - Clean abort after too many consecutive failed files
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use politedl_core::download::{Fetcher, FetchSettings, HttpFetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpFetcher::new(&FetchSettings::default())?;
//! let outcome = fetcher
//!     .fetch("https://example.com/book/0064.png", Path::new("book/0064.png"))
//!     .await;
//! println!("status {:?}, saved {}", outcome.status, outcome.is_saved());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
mod events;
mod pause;
mod politeness;
mod retry_after;
mod tracker;

pub use client::{FetchOutcome, FetchSettings, Fetcher, HttpFetcher, part_path};
pub use engine::{RunEngine, RunError, RunReport, TaskState};
pub use error::DownloadError;
pub use events::RunEvent;
pub use pause::{Pause, TokioPause};
pub use politeness::{
    FailureKind, Jitter, PolitenessPolicy, RetryOutcome, Verdict, WaitPlan, WaitReason, classify,
};
pub use retry_after::{RetryAfterHint, parse_retry_after, parse_retry_after_at};
pub use tracker::FailureTracker;
