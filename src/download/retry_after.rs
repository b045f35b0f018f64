//! `Retry-After` header parsing.
//!
//! The header carries either delta-seconds (`120`) or an HTTP-date
//! (`Wed, 21 Oct 2015 07:28:00 GMT`). A date becomes "time until that date",
//! floored at zero.
//!
//! "Header absent" and "header present but unparsable" are kept apart as
//! [`RetryAfterHint`] variants even though both end up as "no hint" for the
//! scheduler.

use std::time::{Duration, SystemTime};

use reqwest::header::{HeaderMap, RETRY_AFTER};
use tracing::{debug, instrument};

/// What a response said about waiting before the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryAfterHint {
    /// No `Retry-After` header was sent.
    Absent,
    /// A header was sent but is neither delta-seconds nor an HTTP-date.
    Unparsable(String),
    /// A usable wait, possibly zero.
    Delay(Duration),
}

impl RetryAfterHint {
    /// Reads the hint from response headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(value) = headers.get(RETRY_AFTER) else {
            return Self::Absent;
        };
        let Ok(text) = value.to_str() else {
            return Self::Unparsable(String::from_utf8_lossy(value.as_bytes()).into_owned());
        };
        match parse_retry_after(text) {
            Some(delay) => Self::Delay(delay),
            None => Self::Unparsable(text.to_string()),
        }
    }

    /// The usable delay, if any.
    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::Delay(delay) => Some(*delay),
            Self::Absent | Self::Unparsable(_) => None,
        }
    }
}

/// Parses a `Retry-After` value relative to the current time.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use politedl_core::download::parse_retry_after;
///
/// assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
/// assert_eq!(parse_retry_after("soon"), None);
/// ```
#[must_use]
#[instrument]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    parse_retry_after_at(header_value, SystemTime::now())
}

/// Parses a `Retry-After` value relative to `now`.
#[must_use]
pub fn parse_retry_after_at(header_value: &str, now: SystemTime) -> Option<Duration> {
    let header_value = header_value.trim();

    // Integer seconds first (most common)
    if let Ok(seconds) = header_value.parse::<i64>() {
        if seconds < 0 {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        let duration = Duration::from_secs(seconds as u64);
        return Some(duration);
    }

    match httpdate::parse_http_date(header_value) {
        Ok(datetime) => match datetime.duration_since(now) {
            Ok(duration) => Some(duration),
            Err(_) => {
                debug!(header_value, "Retry-After date is in the past, returning zero");
                Some(Duration::ZERO)
            }
        },
        Err(_) => {
            debug!(header_value, "unparseable Retry-After value");
            None
        }
    }
}
