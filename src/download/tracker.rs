//! Consecutive failed-file accounting for one run.
//!
//! The streak counts *files*, not attempts: it grows by one when a file's
//! first attempt fails, and in-place retries never touch it. Any resolved
//! file (saved, or a non-failure status such as 404) resets it to zero.
//! A fresh tracker is created for every run, so nothing carries over between
//! invocations.

use tracing::debug;

use super::constants::DEFAULT_MAX_ERRORS;

/// Run-level failure state (`consecutive failures` and the abort threshold).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureTracker {
    consecutive: u32,
    max_errors: u32,
}

impl Default for FailureTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ERRORS)
    }
}

impl FailureTracker {
    /// Creates a tracker that trips after `max_errors` consecutive failed files (min 1).
    #[must_use]
    pub fn new(max_errors: u32) -> Self {
        Self {
            consecutive: 0,
            max_errors: max_errors.max(1),
        }
    }

    /// Counts a file whose first attempt failed; returns the new streak.
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive = self.consecutive.saturating_add(1);
        debug!(consecutive = self.consecutive, max = self.max_errors, "failure streak grew");
        self.consecutive
    }

    /// Clears the streak after a resolved file.
    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    /// Current streak.
    #[must_use]
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Abort threshold.
    #[must_use]
    pub fn max_errors(&self) -> u32 {
        self.max_errors
    }

    /// Returns true once the streak has reached the threshold.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.consecutive >= self.max_errors
    }
}
