//! Single-attempt HTTP fetcher.
//!
//! [`HttpFetcher`] issues one bounded GET per call and reports a
//! [`FetchOutcome`]. Only a `200` body is written: it is streamed into a
//! `.part` sibling, flushed and synced, then renamed over the destination, so
//! a file is either fully present at its final path or not there at all.
//! Interpreting the status is left to the politeness scheduler.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use super::constants::{DEFAULT_TIMEOUT_SECS, PART_SUFFIX};
use super::error::DownloadError;
use super::retry_after::RetryAfterHint;
use crate::user_agent;

/// HTTP status for a body worth saving.
const STATUS_OK: u16 = 200;

/// What one attempt produced.
///
/// `status` is present whenever the exchange completed at the protocol level.
/// `error` is present for transport failures, and also for a `200` whose body
/// could not be published.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Response status code.
    pub status: Option<u16>,
    /// Server-requested wait before the next request.
    pub retry_after: Option<Duration>,
    /// Transport, timeout or local I/O failure.
    pub error: Option<DownloadError>,
}

impl FetchOutcome {
    /// Outcome of a completed exchange with no local error.
    #[must_use]
    pub fn status(status: u16, retry_after: Option<Duration>) -> Self {
        Self {
            status: Some(status),
            retry_after,
            error: None,
        }
    }

    /// Outcome of an attempt that never got a response.
    #[must_use]
    pub fn transport(error: DownloadError) -> Self {
        Self {
            status: None,
            retry_after: None,
            error: Some(error),
        }
    }

    /// Returns true when the body was received and published.
    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.error.is_none() && self.status == Some(STATUS_OK)
    }
}

/// Settings for the per-run HTTP client.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Bound on one whole attempt: connect, headers and body.
    pub timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: user_agent::default_user_agent(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Performs one download attempt.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`; on `200` publishes the body at `dest`.
    async fn fetch(&self, url: &str, dest: &Path) -> FetchOutcome;
}

/// reqwest-backed [`Fetcher`].
///
/// Created once per run and reused for every attempt, taking advantage of
/// connection pooling. The client timeout applies per request, so it never
/// accumulates across retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher with the given User-Agent and per-attempt timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] if the reqwest client cannot be built.
    pub fn new(settings: &FetchSettings) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(settings.timeout)
            .timeout(settings.timeout)
            .gzip(true)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|source| DownloadError::Client { source })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &str, dest: &Path) -> FetchOutcome {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::transport(DownloadError::from_reqwest(url, e)),
        };

        let status = response.status().as_u16();
        let hint = RetryAfterHint::from_headers(response.headers());
        if let RetryAfterHint::Unparsable(raw) = &hint {
            debug!(status, raw = %raw, "ignoring unparsable Retry-After");
        }
        let retry_after = hint.delay();

        if status != STATUS_OK {
            debug!(status, ?retry_after, "non-200 response, nothing written");
            return FetchOutcome::status(status, retry_after);
        }

        let error = publish_body(response, url, dest).await.err();
        FetchOutcome {
            status: Some(status),
            retry_after,
            error,
        }
    }
}

/// Temporary sibling path used while a body is being written.
#[must_use]
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.as_os_str().to_owned();
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

/// Streams the body to `<dest>.part`, then renames it over `dest`.
///
/// The temporary file is removed if anything fails before the rename.
async fn publish_body(
    response: reqwest::Response,
    url: &str,
    dest: &Path,
) -> Result<u64, DownloadError> {
    let part = part_path(dest);
    let file = File::create(&part)
        .await
        .map_err(|e| DownloadError::io(part.clone(), e))?;

    let written = match stream_to_file(file, response, url, &part).await {
        Ok(written) => written,
        Err(e) => {
            debug!(path = %part.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&part, dest).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(DownloadError::io(dest.to_path_buf(), e));
    }

    debug!(path = %dest.display(), bytes = written, "published download");
    Ok(written)
}

/// Streams response body to file, returning bytes written.
///
/// The file is flushed, synced and closed before this returns.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::from_reqwest(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;
    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_part_path_appends_suffix() {
        let part = part_path(Path::new("book/0064.png"));
        assert_eq!(part, Path::new("book/0064.png.part"));
    }

    #[test]
    fn test_outcome_saved_only_for_clean_200() {
        assert!(FetchOutcome::status(200, None).is_saved());
        assert!(!FetchOutcome::status(404, None).is_saved());
        assert!(!FetchOutcome::status(204, None).is_saved());

        let write_failed = FetchOutcome {
            status: Some(200),
            retry_after: None,
            error: Some(DownloadError::io("x.png", std::io::Error::other("disk full"))),
        };
        assert!(!write_failed.is_saved());
        assert!(!FetchOutcome::transport(DownloadError::timeout("u")).is_saved());
    }

    #[test]
    fn test_fetch_settings_default_timeout() {
        let settings = FetchSettings::default();
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(settings.user_agent.starts_with("politedl/"));
    }

    #[test]
    fn test_http_fetcher_builds_with_defaults() {
        assert!(HttpFetcher::new(&FetchSettings::default()).is_ok());
    }
}
