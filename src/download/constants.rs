//! Defaults for the run (cadence, retries, timeouts, abort threshold).

use std::time::Duration;

/// Default base interval between files (6 seconds).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(6);

/// Default jitter fraction (±20%).
pub const DEFAULT_JITTER_FRAC: f64 = 0.2;

/// Default number of in-place retries per file.
pub const DEFAULT_RETRIES: u32 = 2;

/// Default per-attempt HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default cap on backoff waits (5 minutes).
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(300);

/// Default backoff multiplier (doubles per consecutive failed file).
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Backoff stops compounding after this many consecutive failed files.
pub const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Default number of consecutive failed files before the run stops.
pub const DEFAULT_MAX_ERRORS: u32 = 8;

/// Default file extension, without the dot.
pub const DEFAULT_EXTENSION: &str = "png";

/// Suffix of the temporary sibling a body is streamed into.
pub const PART_SUFFIX: &str = ".part";
