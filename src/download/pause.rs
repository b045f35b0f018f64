//! Suspension seam for the run loop.
//!
//! All waiting goes through [`Pause`] so the orchestrator never sleeps on a
//! hidden clock; tests swap in an implementation that records durations.

use std::time::Duration;

use async_trait::async_trait;

use super::events::RunEvent;
use super::politeness::WaitPlan;

/// Suspends the single control flow of a run.
#[async_trait]
pub trait Pause: Send + Sync {
    /// Waits for `duration`.
    async fn pause(&self, duration: Duration);
}

/// Production [`Pause`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Logs and performs a planned wait. Zero-length plans are skipped silently.
pub(crate) async fn suspend(pause: &dyn Pause, plan: &WaitPlan) {
    if plan.duration.is_zero() {
        return;
    }
    RunEvent::Waiting { plan }.emit();
    pause.pause(plan.duration).await;
}
