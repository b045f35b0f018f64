//! Shared doubles for run-engine tests: a scripted fetcher and a pause that
//! records instead of sleeping.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use politedl_core::download::{
    DownloadError, FetchOutcome, Fetcher, Pause, PolitenessPolicy, RunEngine,
};
use politedl_core::{SourceLayout, TaskRange};

/// Base URL every scripted task lives under.
pub const BASE_URL: &str = "https://scans.example.com/book/";

/// One scripted response.
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200; the body is written to the destination like a real publish.
    Ok,
    /// Any status, optionally with a Retry-After hint.
    Status(u16, Option<Duration>),
    /// The attempt timed out.
    Timeout,
}

impl Reply {
    pub fn status(status: u16) -> Self {
        Self::Status(status, None)
    }

    pub fn retry_after(status: u16, secs: u64) -> Self {
        Self::Status(status, Some(Duration::from_secs(secs)))
    }
}

/// Fetcher answering from per-file scripts; files without a script get `fallback`.
#[derive(Debug)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    fallback: Reply,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new(fallback: Reply) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Scripts the replies for `file` (e.g. `"0065.png"`), consumed in order.
    pub fn script(self, file: &str, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(file.to_string(), replies.into_iter().collect());
        self
    }

    /// File names requested, in order, one entry per attempt.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> FetchOutcome {
        let file = url.rsplit('/').next().unwrap_or(url).to_string();
        self.calls.lock().unwrap().push(file.clone());

        let reply = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&file)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Ok => {
                std::fs::write(dest, file.as_bytes()).unwrap();
                FetchOutcome::status(200, None)
            }
            Reply::Status(status, retry_after) => FetchOutcome::status(status, retry_after),
            Reply::Timeout => FetchOutcome::transport(DownloadError::timeout(url)),
        }
    }
}

/// Pause that returns immediately and remembers every requested duration.
#[derive(Debug, Default)]
pub struct RecordingPause {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingPause {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }

    pub fn waits_secs(&self) -> Vec<u64> {
        self.waits().iter().map(Duration::as_secs).collect()
    }
}

#[async_trait]
impl Pause for RecordingPause {
    async fn pause(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// Policy without jitter so waits can be asserted exactly.
pub fn exact_policy(interval: u64, retries: u32, max_wait: u64, backoff: f64) -> PolitenessPolicy {
    PolitenessPolicy::new(
        Duration::from_secs(interval),
        0.0,
        retries,
        Duration::from_secs(max_wait),
        backoff,
    )
}

/// Range `[start, end]` with the given pad, saving `.png` files into `folder`.
pub fn png_range(folder: &Path, start: u64, end: u64, pad: usize) -> TaskRange {
    let layout = SourceLayout::new(BASE_URL, folder, "png");
    TaskRange::from_indices(start, end, pad, layout).unwrap()
}

/// Engine wired to the given doubles.
pub fn engine(
    policy: PolitenessPolicy,
    max_errors: u32,
    fetcher: &Arc<ScriptedFetcher>,
    pause: &Arc<RecordingPause>,
) -> RunEngine {
    RunEngine::new(policy, max_errors, fetcher.clone(), pause.clone())
}
