//! Structured run events.
//!
//! The run loop reports what it does as [`RunEvent`]s and nothing else
//! formats output. Each event becomes one `tracing` record with an `event`
//! field, so the subscriber decides what is shown: quiet mode keeps only
//! ERROR, which leaves the `abort` record visible.

use std::path::Path;

use tracing::{error, info, warn};

use super::error::DownloadError;
use super::politeness::WaitPlan;

/// Something the run loop did, in the order it did it.
#[derive(Debug)]
pub enum RunEvent<'a> {
    /// Destination already on disk; no request issued.
    Skip {
        /// Label of the skipped file.
        label: &'a str,
        /// Existing destination.
        dest: &'a Path,
    },
    /// First attempt for a file is about to be issued.
    Get {
        /// Request URL.
        url: &'a str,
    },
    /// A file resolved without failure.
    ///
    /// `saved = false` marks a non-failure status (typically 404) that left
    /// nothing on disk.
    Ok {
        /// Label of the file.
        label: &'a str,
        /// Response status.
        status: u16,
        /// Whether a file was published.
        saved: bool,
    },
    /// A file's first attempt failed.
    Fail {
        /// Request URL.
        url: &'a str,
        /// Response status, when the exchange completed.
        status: Option<u16>,
        /// Transport or local error, if any.
        error: Option<&'a DownloadError>,
        /// Consecutive failed files including this one.
        streak: u32,
    },
    /// An in-place retry is about to be issued.
    Retry {
        /// Request URL.
        url: &'a str,
        /// Retry number, starting at 1.
        attempt: u32,
        /// Retries allowed per file.
        max: u32,
    },
    /// The loop is about to sleep.
    Waiting {
        /// The wait being performed.
        plan: &'a WaitPlan,
    },
    /// Every retry failed; moving on to the next index.
    GaveUp {
        /// Request URL.
        url: &'a str,
        /// Retries issued.
        attempts: u32,
    },
    /// Too many consecutive failed files; the run stops.
    Abort {
        /// Consecutive failed files.
        consecutive_failures: u32,
    },
}

impl RunEvent<'_> {
    /// Short machine-readable name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Skip { .. } => "skip",
            Self::Get { .. } => "get",
            Self::Ok { .. } => "ok",
            Self::Fail { .. } => "fail",
            Self::Retry { .. } => "retry",
            Self::Waiting { .. } => "waiting",
            Self::GaveUp { .. } => "gave_up",
            Self::Abort { .. } => "abort",
        }
    }

    /// Emits the event as a tracing record.
    pub fn emit(&self) {
        let event = self.name();
        match self {
            Self::Skip { label, dest } => {
                info!(event, label, dest = %dest.display(), "[skip] exists");
            }
            Self::Get { url } => info!(event, url, "[get ]"),
            Self::Ok {
                label,
                status,
                saved,
            } => {
                if *saved {
                    info!(event, label, status, saved, "[ ok ]");
                } else {
                    // Logged as ok but nothing is on disk.
                    info!(event, label, status, saved, "[ ok ] no file written");
                }
            }
            Self::Fail {
                url,
                status,
                error,
                streak,
            } => warn!(
                event,
                url,
                status = ?status,
                error = error.map(tracing::field::display),
                streak,
                "[fail]"
            ),
            Self::Retry { url, attempt, max } => info!(event, url, attempt, max, "[retry]"),
            Self::Waiting { plan } => {
                #[allow(clippy::cast_possible_truncation)]
                let wait_ms = plan.duration.as_millis() as u64;
                info!(event, wait_ms, reason = %plan.reason, "waiting {:?}", plan.duration);
            }
            Self::GaveUp { url, attempts } => {
                warn!(event, url, attempts, "[gave up] moving on");
            }
            Self::Abort {
                consecutive_failures,
            } => error!(
                event,
                consecutive_failures,
                "Too many consecutive errors ({consecutive_failures}). Stopping politely."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_distinct() {
        let plan = WaitPlan {
            duration: std::time::Duration::from_secs(1),
            base: std::time::Duration::from_secs(1),
            reason: crate::download::WaitReason::Cadence,
        };
        let events = [
            RunEvent::Skip {
                label: "01",
                dest: Path::new("01.png"),
            },
            RunEvent::Get { url: "u" },
            RunEvent::Ok {
                label: "01",
                status: 200,
                saved: true,
            },
            RunEvent::Fail {
                url: "u",
                status: Some(503),
                error: None,
                streak: 1,
            },
            RunEvent::Retry {
                url: "u",
                attempt: 1,
                max: 2,
            },
            RunEvent::Waiting { plan: &plan },
            RunEvent::GaveUp {
                url: "u",
                attempts: 2,
            },
            RunEvent::Abort {
                consecutive_failures: 8,
            },
        ];
        let mut names: Vec<&str> = events.iter().map(RunEvent::name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), events.len());
        assert_ne!(events[7].name(), events[3].name());
    }
}
