//! Minimum-interval pacing for outbound model calls.
//!
//! The timestamp of the last completed call sits behind an async mutex and a
//! caller holds the lock from the moment it is cleared to go until its call
//! returns. Concurrent requests therefore queue up and each observes the
//! completion time of the one before it.

use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

pub struct Pacer {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

/// Exclusive right to make one outbound call.
///
/// Dropping the permit records the current instant as the last call time.
pub struct PacerPermit<'a> {
    last_call: MutexGuard<'a, Option<Instant>>,
    waited: Duration,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Wait until at least `min_interval` has passed since the previous call
    /// finished, then hand out the permit for the next one.
    pub async fn acquire(&self) -> PacerPermit<'_> {
        let last_call = self.last_call.lock().await;

        let wait = (*last_call)
            .map(|last| self.min_interval.saturating_sub(last.elapsed()))
            .unwrap_or(Duration::ZERO);

        if !wait.is_zero() {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Pacing outbound model call");
            tokio::time::sleep(wait).await;
        }

        PacerPermit {
            last_call,
            waited: wait,
        }
    }
}

impl PacerPermit<'_> {
    /// Pacing delay applied before the permit was granted; zero when the
    /// interval had already passed. Queueing on the lock is not counted.
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

impl Drop for PacerPermit<'_> {
    fn drop(&mut self) {
        *self.last_call = Some(Instant::now());
    }
}
