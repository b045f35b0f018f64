//! Politeness scheduling: how long to wait after every attempt, and whether
//! to try a file again.
//!
//! # Overview
//!
//! Every attempt's [`FetchOutcome`] is first classified into a [`Verdict`].
//! An outcome is a *failure* when it carries a transport error or a status
//! `>= 400` other than `404`. A `404` counts as resolved even though nothing
//! is saved.
//!
//! The base wait is then chosen in priority order:
//!
//! 1. a non-zero `Retry-After` hint from the server, as sent;
//! 2. for a failure, exponential backoff across consecutive failed files:
//!    `interval * multiplier^min(streak, 6)`, capped at `max_wait`;
//! 3. otherwise the plain `interval`.
//!
//! Every suspension draws fresh [`Jitter`] around its base, so the request
//! cadence never settles into a fixed, detectable period.
//!
//! Backoff compounds only across *files*. Inside one file's retry loop
//! ([`PolitenessPolicy::retry_in_place`]) each wait is the hint or the plain
//! interval, so a single hiccup never escalates into a long stall.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use politedl_core::download::{FetchOutcome, PolitenessPolicy, WaitReason};
//!
//! let policy = PolitenessPolicy::new(Duration::from_secs(6), 0.0, 1, Duration::from_secs(60), 2.0);
//!
//! let overloaded = FetchOutcome::status(503, None);
//! let plan = policy.failure_wait(&overloaded, 2);
//! assert_eq!(plan.duration, Duration::from_secs(24));
//! assert_eq!(plan.reason, WaitReason::Backoff { streak: 2 });
//!
//! let throttled = FetchOutcome::status(429, Some(Duration::from_secs(120)));
//! assert_eq!(policy.failure_wait(&throttled, 5).duration, Duration::from_secs(120));
//! ```

use std::fmt;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::client::{FetchOutcome, Fetcher};
use super::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INTERVAL, DEFAULT_JITTER_FRAC, DEFAULT_MAX_WAIT,
    DEFAULT_RETRIES, MAX_BACKOFF_EXPONENT,
};
use super::events::RunEvent;
use super::pause::{Pause, suspend};
use crate::range::DownloadTask;

/// Status treated as "resolved" even though it is an error code.
const STATUS_NOT_FOUND: u16 = 404;

/// Why an attempt counts as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network, timeout or local I/O error.
    Transport,
    /// A 4xx/5xx status other than 404.
    UnsuccessfulStatus(u16),
}

/// Scheduling classification of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// `200` with the body published at its destination.
    Saved,
    /// A non-failure status that produced no file, typically `404`.
    Unsaved {
        /// The response status.
        status: u16,
    },
    /// Counts against the consecutive failure streak.
    Failed(FailureKind),
}

impl Verdict {
    /// Returns true for [`Verdict::Failed`].
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Classifies an attempt for scheduling and streak accounting.
#[must_use]
pub fn classify(outcome: &FetchOutcome) -> Verdict {
    if outcome.error.is_some() {
        return Verdict::Failed(FailureKind::Transport);
    }
    match outcome.status {
        Some(200) => Verdict::Saved,
        Some(status) if status >= 400 && status != STATUS_NOT_FOUND => {
            Verdict::Failed(FailureKind::UnsuccessfulStatus(status))
        }
        Some(status) => Verdict::Unsaved { status },
        // A fetcher that reports neither a status nor an error never reached the server.
        None => Verdict::Failed(FailureKind::Transport),
    }
}

/// Symmetric random perturbation of a wait.
///
/// A base `b` with fraction `f` becomes a uniform draw from
/// `[b - f*b, b + f*b]`, floored at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    frac: f64,
}

impl Default for Jitter {
    fn default() -> Self {
        Self::new(DEFAULT_JITTER_FRAC)
    }
}

impl Jitter {
    /// Creates a jitter; the fraction is clamped to `0.0..=1.0` and NaN becomes `0.0`.
    #[must_use]
    pub fn new(frac: f64) -> Self {
        let frac = if frac.is_nan() { 0.0 } else { frac.clamp(0.0, 1.0) };
        Self { frac }
    }

    /// The configured fraction.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        self.frac
    }

    /// Applies a fresh random offset to `base`.
    #[must_use]
    pub fn apply(&self, base: Duration) -> Duration {
        self.apply_with(base, &mut rand::thread_rng())
    }

    /// Applies a random offset drawn from `rng`.
    #[must_use]
    pub fn apply_with<R: Rng + ?Sized>(&self, base: Duration, rng: &mut R) -> Duration {
        let base_secs = base.as_secs_f64();
        let spread = base_secs * self.frac;
        if spread <= 0.0 {
            return base;
        }
        let offset = rng.gen_range(-spread..=spread);
        let secs = (base_secs + offset).max(0.0);
        Duration::try_from_secs_f64(secs).unwrap_or(base)
    }
}

/// What a wait is for; carried into the `waiting` log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    /// Normal spacing between files or between in-place retries.
    Cadence,
    /// The server asked for this wait.
    RetryAfter,
    /// Exponential backoff after `streak` consecutive failed files.
    Backoff {
        /// Consecutive failed files at the time of the wait.
        streak: u32,
    },
}

impl fmt::Display for WaitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cadence => f.write_str("cadence"),
            Self::RetryAfter => f.write_str("retry-after"),
            Self::Backoff { streak } => write!(f, "backoff x{streak}"),
        }
    }
}

/// One suspension, computed fresh each time and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPlan {
    /// Jittered duration to actually sleep.
    pub duration: Duration,
    /// Base before jitter.
    pub base: Duration,
    /// Which rule chose the base.
    pub reason: WaitReason,
}

/// Result of a file's in-place retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// A retry saved the file.
    Recovered {
        /// Retry attempts issued, including the successful one.
        attempts: u32,
    },
    /// Every retry failed; the file is abandoned.
    GaveUp {
        /// Retry attempts issued.
        attempts: u32,
    },
}

/// Wait and retry policy for a run.
///
/// # Default Values
///
/// - `interval`: 6 seconds
/// - `jitter`: ±20%
/// - `retries`: 2
/// - `max_wait`: 300 seconds
/// - `backoff_multiplier`: 2.0
#[derive(Debug, Clone)]
pub struct PolitenessPolicy {
    interval: Duration,
    jitter: Jitter,
    retries: u32,
    max_wait: Duration,
    backoff_multiplier: f64,
}

impl Default for PolitenessPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            jitter: Jitter::default(),
            retries: DEFAULT_RETRIES,
            max_wait: DEFAULT_MAX_WAIT,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl PolitenessPolicy {
    /// Creates a policy.
    ///
    /// # Arguments
    ///
    /// * `interval` - Base spacing between files and between retries
    /// * `jitter_frac` - Jitter fraction, clamped to `0.0..=1.0`
    /// * `retries` - In-place retries after a failed first attempt
    /// * `max_wait` - Cap on backoff waits
    /// * `backoff_multiplier` - Growth factor per consecutive failed file
    #[must_use]
    pub fn new(
        interval: Duration,
        jitter_frac: f64,
        retries: u32,
        max_wait: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            interval,
            jitter: Jitter::new(jitter_frac),
            retries,
            max_wait,
            backoff_multiplier,
        }
    }

    /// Base spacing between files.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Jitter applied to every wait.
    #[must_use]
    pub fn jitter(&self) -> Jitter {
        self.jitter
    }

    /// In-place retries per file.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Cap on backoff waits.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Backoff growth factor.
    #[must_use]
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Unjittered backoff after `streak` consecutive failed files.
    ///
    /// Formula: `min(interval * multiplier^min(streak, 6), max_wait)`
    #[must_use]
    pub fn backoff(&self, streak: u32) -> Duration {
        let exponent = streak.min(MAX_BACKOFF_EXPONENT);
        #[allow(clippy::cast_possible_wrap)]
        let factor = self.backoff_multiplier.powi(exponent as i32);
        let secs = (self.interval.as_secs_f64() * factor).min(self.max_wait.as_secs_f64());
        Duration::try_from_secs_f64(secs).unwrap_or(self.max_wait)
    }

    /// Spacing between files (and after a skip).
    #[must_use]
    pub fn cadence_wait(&self) -> WaitPlan {
        self.plan(self.interval, WaitReason::Cadence)
    }

    /// Wait after a file's first attempt failed, `streak` already counting it.
    #[must_use]
    #[instrument(level = "debug", skip(self, outcome), fields(status = ?outcome.status))]
    pub fn failure_wait(&self, outcome: &FetchOutcome, streak: u32) -> WaitPlan {
        match server_hint(outcome) {
            Some(hint) => self.plan(hint, WaitReason::RetryAfter),
            None => self.plan(self.backoff(streak), WaitReason::Backoff { streak }),
        }
    }

    /// Wait after a failed in-place retry. Never compounds.
    #[must_use]
    pub fn retry_wait(&self, outcome: &FetchOutcome) -> WaitPlan {
        match server_hint(outcome) {
            Some(hint) => self.plan(hint, WaitReason::RetryAfter),
            None => self.plan(self.interval, WaitReason::Cadence),
        }
    }

    fn plan(&self, base: Duration, reason: WaitReason) -> WaitPlan {
        WaitPlan {
            duration: self.jitter.apply(base),
            base,
            reason,
        }
    }

    /// Runs up to `retries` further attempts for a file whose first attempt failed.
    ///
    /// The caller has already performed the error-class wait. Stops on the
    /// first attempt that saves the file. Every failed attempt is followed by
    /// a wait derived from its own outcome, the last one included, so an
    /// abandoned file is still spaced from the next index.
    pub async fn retry_in_place(
        &self,
        task: &DownloadTask,
        fetcher: &dyn Fetcher,
        pause: &dyn Pause,
    ) -> RetryOutcome {
        for attempt in 1..=self.retries {
            RunEvent::Retry {
                url: &task.url,
                attempt,
                max: self.retries,
            }
            .emit();

            let outcome = fetcher.fetch(&task.url, &task.dest).await;
            if outcome.is_saved() {
                RunEvent::Ok {
                    label: &task.label,
                    status: 200,
                    saved: true,
                }
                .emit();
                return RetryOutcome::Recovered { attempts: attempt };
            }

            debug!(
                url = %task.url,
                attempt,
                status = ?outcome.status,
                verdict = ?classify(&outcome),
                "retry attempt did not save the file"
            );
            suspend(pause, &self.retry_wait(&outcome)).await;
        }

        RetryOutcome::GaveUp {
            attempts: self.retries,
        }
    }
}

/// A `Retry-After` hint strong enough to override the computed base.
///
/// A zero hint (including an HTTP-date already in the past) does not override.
fn server_hint(outcome: &FetchOutcome) -> Option<Duration> {
    outcome.retry_after.filter(|hint| !hint.is_zero())
}
