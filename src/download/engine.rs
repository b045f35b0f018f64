//! Sequential run engine: walks a [`TaskRange`] one file at a time.
//!
//! # Overview
//!
//! For each task, in ascending index order:
//!
//! - **Skipped**: the destination already exists. No request is issued, but
//!   one jittered `interval` wait still follows, the last index included, so
//!   existence checks never turn into a burst.
//! - **Succeeded**: the first attempt resolved (saved, or a non-failure status
//!   such as 404). The failure streak resets to zero.
//! - **Failed**: the first attempt failed. The streak grows by one and, if it
//!   reached the threshold, the run aborts before waiting. Otherwise the
//!   error-class wait (Retry-After hint or backoff) is performed and the
//!   in-place retry loop runs, ending in **Succeeded** or **GivenUp**.
//!
//! After a succeeded task that is not the last index, one jittered
//! `interval` wait spaces it from the next. A given-up task moves on at once;
//! its retry loop already waited.
//!
//! Nothing runs concurrently. Each fetch and each wait is awaited before the
//! next step starts, which keeps requests strictly ordered and spaced.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use politedl_core::download::{FetchSettings, HttpFetcher, PolitenessPolicy, RunEngine, TokioPause};
//! use politedl_core::layout::SourceLayout;
//! use politedl_core::range::{IndexLabel, TaskRange};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let layout = SourceLayout::from_sample_url("https://example.com/book/0001.png", Path::new("."), "png")?;
//! let range = TaskRange::new(&IndexLabel::parse("0001")?, &IndexLabel::parse("0077")?, layout)?;
//! let fetcher = Arc::new(HttpFetcher::new(&FetchSettings::default())?);
//! let engine = RunEngine::new(PolitenessPolicy::default(), 8, fetcher, Arc::new(TokioPause));
//! let report = engine.run(&range).await?;
//! println!("downloaded {}, skipped {}", report.downloaded, report.skipped);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::client::Fetcher;
use super::events::RunEvent;
use super::pause::{Pause, suspend};
use super::politeness::{PolitenessPolicy, RetryOutcome, Verdict, classify};
use super::tracker::FailureTracker;
use crate::range::{DownloadTask, TaskRange};

/// Error ending a run early.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The consecutive failed-file streak reached the threshold.
    ///
    /// A clean, deliberate stop: no further file is attempted.
    #[error("too many consecutive errors ({consecutive_failures}); stopped politely")]
    ThresholdAbort {
        /// Streak length at the time of the abort.
        consecutive_failures: u32,
        /// Counts up to the abort.
        report: RunReport,
    },
}

/// Counts from one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Files published at their destination.
    pub downloaded: usize,
    /// Files already on disk.
    pub skipped: usize,
    /// Files resolved by a non-failure status with nothing written (typically 404).
    pub not_found: usize,
    /// Files abandoned after exhausting retries.
    pub given_up: usize,
    /// Files whose first attempt failed.
    pub failed_files: usize,
    /// In-place retry attempts issued.
    pub retries: usize,
}

impl RunReport {
    /// Number of tasks the run looked at.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.downloaded + self.skipped + self.not_found + self.given_up
    }
}

/// Final state of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Destination existed; nothing fetched.
    Skipped,
    /// Resolved, on the first attempt or after retrying.
    Succeeded,
    /// Retries exhausted.
    GivenUp,
    /// Streak reached the threshold; the run must end.
    Aborted,
}

/// Drives a range through fetch, classification, waiting and retry.
pub struct RunEngine {
    policy: PolitenessPolicy,
    max_errors: u32,
    fetcher: Arc<dyn Fetcher>,
    pause: Arc<dyn Pause>,
}

impl std::fmt::Debug for RunEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunEngine")
            .field("policy", &self.policy)
            .field("max_errors", &self.max_errors)
            .finish_non_exhaustive()
    }
}

impl RunEngine {
    /// Creates an engine.
    ///
    /// # Arguments
    ///
    /// * `policy` - Wait and retry policy
    /// * `max_errors` - Consecutive failed files that abort the run (min 1)
    /// * `fetcher` - Performs one attempt
    /// * `pause` - Performs every wait
    #[must_use]
    pub fn new(
        policy: PolitenessPolicy,
        max_errors: u32,
        fetcher: Arc<dyn Fetcher>,
        pause: Arc<dyn Pause>,
    ) -> Self {
        Self {
            policy,
            max_errors,
            fetcher,
            pause,
        }
    }

    /// Wait and retry policy in use.
    #[must_use]
    pub fn policy(&self) -> &PolitenessPolicy {
        &self.policy
    }

    /// Processes every task of `range` in order.
    ///
    /// Each call starts with a fresh failure streak.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::ThresholdAbort`] when `max_errors` consecutive
    /// files fail; the remaining indices are not attempted.
    #[instrument(skip(self, range), fields(start = range.start(), end = range.end()))]
    pub async fn run(&self, range: &TaskRange) -> Result<RunReport, RunError> {
        let mut tracker = FailureTracker::new(self.max_errors);
        let mut report = RunReport::default();

        for task in range.iter() {
            let is_last = task.index == range.end();
            let state = self.process_task(&task, &mut tracker, &mut report).await;
            debug!(label = %task.label, ?state, streak = tracker.consecutive(), "task finished");

            match state {
                TaskState::Aborted => {
                    return Err(RunError::ThresholdAbort {
                        consecutive_failures: tracker.consecutive(),
                        report,
                    });
                }
                TaskState::Skipped => {
                    suspend(self.pause.as_ref(), &self.policy.cadence_wait()).await;
                }
                TaskState::Succeeded if !is_last => {
                    suspend(self.pause.as_ref(), &self.policy.cadence_wait()).await;
                }
                TaskState::Succeeded | TaskState::GivenUp => {}
            }
        }

        info!(
            downloaded = report.downloaded,
            skipped = report.skipped,
            not_found = report.not_found,
            given_up = report.given_up,
            retries = report.retries,
            "run complete"
        );
        Ok(report)
    }

    async fn process_task(
        &self,
        task: &DownloadTask,
        tracker: &mut FailureTracker,
        report: &mut RunReport,
    ) -> TaskState {
        if destination_exists(task).await {
            RunEvent::Skip {
                label: &task.label,
                dest: &task.dest,
            }
            .emit();
            report.skipped += 1;
            return TaskState::Skipped;
        }

        RunEvent::Get { url: &task.url }.emit();
        let outcome = self.fetcher.fetch(&task.url, &task.dest).await;

        match classify(&outcome) {
            Verdict::Saved => {
                RunEvent::Ok {
                    label: &task.label,
                    status: 200,
                    saved: true,
                }
                .emit();
                tracker.reset();
                report.downloaded += 1;
                TaskState::Succeeded
            }
            Verdict::Unsaved { status } => {
                RunEvent::Ok {
                    label: &task.label,
                    status,
                    saved: false,
                }
                .emit();
                tracker.reset();
                report.not_found += 1;
                TaskState::Succeeded
            }
            Verdict::Failed(kind) => {
                let streak = tracker.record_failure();
                report.failed_files += 1;
                RunEvent::Fail {
                    url: &task.url,
                    status: outcome.status,
                    error: outcome.error.as_ref(),
                    streak,
                }
                .emit();
                debug!(?kind, "first attempt failed");

                if tracker.is_exhausted() {
                    RunEvent::Abort {
                        consecutive_failures: streak,
                    }
                    .emit();
                    return TaskState::Aborted;
                }

                let plan = self.policy.failure_wait(&outcome, streak);
                suspend(self.pause.as_ref(), &plan).await;

                match self
                    .policy
                    .retry_in_place(task, self.fetcher.as_ref(), self.pause.as_ref())
                    .await
                {
                    RetryOutcome::Recovered { attempts } => {
                        tracker.reset();
                        report.retries += attempts as usize;
                        report.downloaded += 1;
                        TaskState::Succeeded
                    }
                    RetryOutcome::GaveUp { attempts } => {
                        RunEvent::GaveUp {
                            url: &task.url,
                            attempts,
                        }
                        .emit();
                        report.retries += attempts as usize;
                        report.given_up += 1;
                        TaskState::GivenUp
                    }
                }
            }
        }
    }
}

/// Skip-by-existence check. An unreadable path counts as absent.
async fn destination_exists(task: &DownloadTask) -> bool {
    match tokio::fs::try_exists(&task.dest).await {
        Ok(exists) => exists,
        Err(e) => {
            debug!(path = %task.dest.display(), error = %e, "existence check failed, fetching");
            false
        }
    }
}
