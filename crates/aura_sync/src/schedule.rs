//! Due-time bookkeeping for the periodic sync trigger.

use std::time::{Duration, Instant};

/// Tracks when the next scheduled run is due.
///
/// A fresh scheduler is due immediately, so the first run happens at start-up.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    last_run: Option<Instant>,
}

impl Scheduler {
    /// Creates a scheduler that runs every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
        }
    }

    /// The run interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the last run started, if any.
    pub fn last_run(&self) -> Option<Instant> {
        self.last_run
    }

    /// Returns true if a run should start at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.time_until_due(now).is_zero()
    }

    /// Records that a run started at `now`.
    pub fn mark_ran(&mut self, now: Instant) {
        self.last_run = Some(now);
    }

    /// Time left until the next run, zero if one is due.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        match self.last_run {
            None => Duration::ZERO,
            Some(last) => (last + self.interval).saturating_duration_since(now),
        }
    }
}
