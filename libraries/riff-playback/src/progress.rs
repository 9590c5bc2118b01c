//! Progress polling
//!
//! While a live session is playing, the player task mirrors the session
//! position into the engine at a fixed cadence. The synchronizer owns the
//! timer and only yields ticks while polling is active; otherwise
//! [`ProgressSynchronizer::tick`] never resolves, so an idle player has no
//! wake-ups.

use crate::types::PlaybackStatus;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Timer gate for position polling
#[derive(Debug)]
pub struct ProgressSynchronizer {
    period: Duration,
    interval: Option<Interval>,
}

impl ProgressSynchronizer {
    /// Create a stopped synchronizer polling every `period`
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            interval: None,
        }
    }

    /// Polling period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start or stop polling to match the engine state
    ///
    /// Runs only while `status` is Playing and a session is live. Starting
    /// schedules the first tick one period out.
    pub fn observe(&mut self, status: PlaybackStatus, has_session: bool) {
        let should_run = status == PlaybackStatus::Playing && has_session;

        match (should_run, self.interval.is_some()) {
            (true, false) => {
                let mut interval = interval_at(Instant::now() + self.period, self.period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.interval = Some(interval);
                debug!(period_ms = self.period.as_millis() as u64, "Progress polling started");
            }
            (false, true) => {
                self.interval = None;
                debug!("Progress polling stopped");
            }
            _ => {}
        }
    }

    /// Whether polling is active
    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Wait for the next poll
    ///
    /// Pends forever while stopped. Cancel safe.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}
