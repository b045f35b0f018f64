//! Zero-padded index ranges and the download tasks they expand into.
//!
//! A run covers every index in `[start, end]` inclusive. The label width is
//! fixed once from the start label (`"0064"` gives a width of 4) and is never
//! recomputed per index.
//!
//! # Example
//!
//! ```
//! use politedl_core::layout::SourceLayout;
//! use politedl_core::range::{IndexLabel, TaskRange};
//! use std::path::Path;
//!
//! let layout = SourceLayout::from_sample_url("https://example.com/book/0064.png", Path::new("."), "png")?;
//! let start = IndexLabel::parse("0064")?;
//! let end = IndexLabel::parse("66")?;
//! let range = TaskRange::new(&start, &end, layout)?;
//!
//! let labels: Vec<String> = range.iter().map(|task| task.label).collect();
//! assert_eq!(labels, ["0064", "0065", "0066"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::layout::SourceLayout;

/// Errors raised while building a range, before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// The end index lies before the start index.
    #[error("end ({end}) must be >= start ({start})")]
    InvalidRange {
        /// Numeric start index.
        start: u64,
        /// Numeric end index.
        end: u64,
    },

    /// A label contained something other than ASCII digits.
    #[error("label must be digits only (e.g., 0064), got {label:?}")]
    NotDigits {
        /// The rejected label.
        label: String,
    },

    /// A label is numerically too large to index.
    #[error("label {label} is too large")]
    LabelOverflow {
        /// The rejected label.
        label: String,
    },

    /// The end index needs more digits than the start label provides.
    #[error("end ({end}) needs more than {pad} digits; widen the start label")]
    EndTooWide {
        /// Numeric end index.
        end: u64,
        /// Fixed label width derived from the start label.
        pad: usize,
    },
}

/// A digits-only label as typed by the user, e.g. `0064`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLabel {
    value: u64,
    width: usize,
}

impl IndexLabel {
    /// Parses a label, ignoring leading zeros for the numeric value.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::NotDigits`] for empty or non-digit input and
    /// [`RangeError::LabelOverflow`] when the value does not fit in `u64`.
    pub fn parse(label: &str) -> Result<Self, RangeError> {
        if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RangeError::NotDigits {
                label: label.to_string(),
            });
        }
        let value = label
            .parse::<u64>()
            .map_err(|_| RangeError::LabelOverflow {
                label: label.to_string(),
            })?;
        Ok(Self {
            value,
            width: label.len(),
        })
    }

    /// Numeric value of the label.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Number of characters the label was written with.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }
}

/// One file of the range: immutable, consumed once by the run engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Numeric index.
    pub index: u64,
    /// Index left-padded with zeros to the run's fixed width.
    pub label: String,
    /// Remote location of the file.
    pub url: String,
    /// Final on-disk location of the file.
    pub dest: PathBuf,
}

/// Inclusive, ascending range of indices plus the layout that names them.
///
/// The range itself is stateless: [`TaskRange::iter`] can be called any
/// number of times and always starts again from `start`.
#[derive(Debug, Clone)]
pub struct TaskRange {
    start: u64,
    end: u64,
    pad: usize,
    layout: SourceLayout,
}

impl TaskRange {
    /// Builds a range from user labels; the start label fixes the pad width.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::InvalidRange`] when `end < start` and
    /// [`RangeError::EndTooWide`] when the end index cannot be written in
    /// the start label's width.
    pub fn new(
        start: &IndexLabel,
        end: &IndexLabel,
        layout: SourceLayout,
    ) -> Result<Self, RangeError> {
        let pad = start.width();
        if natural_width(end.value()) > pad {
            return Err(RangeError::EndTooWide {
                end: end.value(),
                pad,
            });
        }
        Self::from_indices(start.value(), end.value(), pad, layout)
    }

    /// Builds a range from raw indices and an explicit pad width.
    ///
    /// Over-width indices are not rejected here; they print at their
    /// natural width.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::InvalidRange`] when `end < start`.
    pub fn from_indices(
        start: u64,
        end: u64,
        pad: usize,
        layout: SourceLayout,
    ) -> Result<Self, RangeError> {
        if end < start {
            return Err(RangeError::InvalidRange { start, end });
        }
        debug!(start, end, pad, "built task range");
        Ok(Self {
            start,
            end,
            pad,
            layout,
        })
    }

    /// First index of the range.
    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last index of the range (inclusive).
    #[must_use]
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Fixed label width for the whole run.
    #[must_use]
    pub fn pad(&self) -> usize {
        self.pad
    }

    /// Layout used to derive URLs and destination paths.
    #[must_use]
    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    /// Number of tasks in the range, saturating at `u64::MAX` for `0..=u64::MAX`.
    #[must_use]
    pub fn len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    /// Always false: a valid range holds at least one index.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Formats `index` to the run's fixed width.
    #[must_use]
    pub fn label_for(&self, index: u64) -> String {
        format!("{index:0width$}", width = self.pad)
    }

    /// Returns the task for a single index.
    #[must_use]
    pub fn task(&self, index: u64) -> DownloadTask {
        let label = self.label_for(index);
        DownloadTask {
            index,
            url: self.layout.url_for(&label),
            dest: self.layout.path_for(&label),
            label,
        }
    }

    /// Lazily yields every task in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = DownloadTask> + '_ {
        (self.start..=self.end).map(|index| self.task(index))
    }
}

fn natural_width(value: u64) -> usize {
    value.to_string().len()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use super::*;

    fn layout() -> SourceLayout {
        SourceLayout::from_sample_url("https://example.com/scans/0064.png", Path::new("out"), "png")
            .unwrap()
    }

    // ==================== IndexLabel Tests ====================

    #[test]
    fn test_label_parse_keeps_width_and_value() {
        let label = IndexLabel::parse("0064").unwrap();
        assert_eq!(label.value(), 64);
        assert_eq!(label.width(), 4);
    }

    #[test]
    fn test_label_parse_all_zeros_is_zero() {
        let label = IndexLabel::parse("0000").unwrap();
        assert_eq!(label.value(), 0);
        assert_eq!(label.width(), 4);
    }

    #[test]
    fn test_label_parse_rejects_non_digits() {
        for bad in ["", "12a", "-5", " 12", "+1", "١٢"] {
            assert!(
                matches!(IndexLabel::parse(bad), Err(RangeError::NotDigits { .. })),
                "expected NotDigits for {bad:?}"
            );
        }
    }

    #[test]
    fn test_label_parse_rejects_overflow() {
        let result = IndexLabel::parse("99999999999999999999999");
        assert!(matches!(result, Err(RangeError::LabelOverflow { .. })));
    }

    // ==================== TaskRange Tests ====================

    #[test]
    fn test_range_yields_inclusive_ascending_padded_tasks() {
        let start = IndexLabel::parse("0064").unwrap();
        let end = IndexLabel::parse("0077").unwrap();
        let range = TaskRange::new(&start, &end, layout()).unwrap();

        let tasks: Vec<DownloadTask> = range.iter().collect();
        assert_eq!(tasks.len() as u64, range.len());
        assert_eq!(tasks.len(), 14);
        assert!(tasks.windows(2).all(|w| w[0].index + 1 == w[1].index));
        assert!(tasks.iter().all(|t| t.label.len() == 4));
        assert_eq!(tasks[0].label, "0064");
        assert_eq!(tasks[13].label, "0077");
    }

    #[test]
    fn test_range_single_index_when_start_equals_end() {
        let start = IndexLabel::parse("007").unwrap();
        let range = TaskRange::new(&start, &start, layout()).unwrap();
        let tasks: Vec<DownloadTask> = range.iter().collect();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].label, "007");
    }

    #[test]
    fn test_range_unpadded_end_uses_start_width() {
        let start = IndexLabel::parse("0064").unwrap();
        let end = IndexLabel::parse("66").unwrap();
        let range = TaskRange::new(&start, &end, layout()).unwrap();
        let last = range.iter().last().unwrap();
        assert_eq!(last.label, "0066");
    }

    #[test]
    fn test_range_end_before_start_is_invalid() {
        let start = IndexLabel::parse("0064").unwrap();
        let end = IndexLabel::parse("0063").unwrap();
        let result = TaskRange::new(&start, &end, layout());
        assert_eq!(
            result.unwrap_err(),
            RangeError::InvalidRange { start: 64, end: 63 }
        );
    }

    #[test]
    fn test_range_rejects_end_wider_than_pad() {
        let start = IndexLabel::parse("99").unwrap();
        let end = IndexLabel::parse("100").unwrap();
        let result = TaskRange::new(&start, &end, layout());
        assert_eq!(
            result.unwrap_err(),
            RangeError::EndTooWide { end: 100, pad: 2 }
        );
    }

    #[test]
    fn test_range_from_indices_prints_overflow_at_natural_width() {
        let range = TaskRange::from_indices(98, 100, 2, layout()).unwrap();
        let labels: Vec<String> = range.iter().map(|t| t.label).collect();
        assert_eq!(labels, ["98", "99", "100"]);
    }

    #[test]
    fn test_range_len_saturates_for_full_u64_span() {
        let start = IndexLabel::parse("00000000000000000000").unwrap();
        let end = IndexLabel::parse("18446744073709551615").unwrap();
        let range = TaskRange::new(&start, &end, layout()).unwrap();
        assert_eq!(range.len(), u64::MAX);
        assert_eq!(range.iter().next().unwrap().label, "00000000000000000000");
    }

    #[test]
    fn test_range_iter_is_restartable() {
        let range = TaskRange::from_indices(1, 3, 2, layout()).unwrap();
        let first: Vec<DownloadTask> = range.iter().collect();
        let second: Vec<DownloadTask> = range.iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_range_task_urls_and_paths_are_unique() {
        let range = TaskRange::from_indices(0, 9, 2, layout()).unwrap();
        let tasks: Vec<DownloadTask> = range.iter().collect();
        assert_eq!(tasks[3].url, "https://example.com/scans/03.png");
        assert_eq!(tasks[3].dest, Path::new("out").join("scans").join("03.png"));

        let mut dests: Vec<&PathBuf> = tasks.iter().map(|t| &t.dest).collect();
        dests.dedup();
        assert_eq!(dests.len(), tasks.len());
    }
}
