//! Polite range downloader core library.
//!
//! Fetches a contiguous, zero-padded numeric range of remote files one at a
//! time (`0001.png`, `0002.png`, ...), resuming by skipping files already on
//! disk and pacing itself so a rate-limiting server never sees a burst.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`range`] - Label parsing and the ordered task sequence
//! - [`layout`] - Base URL and destination folder from a sample link
//! - [`download`] - Fetcher, politeness scheduler, failure tracker and run engine

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod layout;
pub mod range;
pub mod user_agent;

// Re-export commonly used types
pub use download::{
    DownloadError, FetchOutcome, FetchSettings, Fetcher, HttpFetcher, PolitenessPolicy,
    RunEngine, RunError, RunReport, TokioPause,
};
pub use layout::{LayoutError, SourceLayout};
pub use range::{DownloadTask, IndexLabel, RangeError, TaskRange};
