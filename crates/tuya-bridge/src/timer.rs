//! Restartable single-shot reset timers
//!
//! Some devices report an event (motion, valve lock) and never send the
//! matching "cleared" state; the bridge synthesizes it after a
//! device-specific delay. Re-triggering an active timer restarts it, so
//! the clear fires exactly once per quiet period.

use crate::cluster::{AttributeValue, ClusterSet};
use crate::mapping::AttributeTarget;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Single-shot cancellable timer that writes a clearing attribute value
/// on expiry
pub struct ResetTimer {
    duration: Duration,
    clusters: ClusterSet,
    target: AttributeTarget,
    clear_value: AttributeValue,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ResetTimer {
    #[must_use]
    pub fn new(
        clusters: ClusterSet,
        target: AttributeTarget,
        clear_value: AttributeValue,
        duration: Duration,
    ) -> Self {
        Self {
            duration,
            clusters,
            target,
            clear_value,
            handle: Mutex::new(None),
        }
    }

    /// Start the timer, restarting it if already active
    ///
    /// Cancellation of the previous task happens before the new one is
    /// spawned, under the handle lock, so no double-fire can be observed.
    pub fn trigger(&self) {
        let mut guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = guard.take() {
            previous.abort();
            tracing::debug!(
                "Restarting {:?}s reset timer for {}",
                self.duration.as_secs(),
                self.target.attribute
            );
        }

        let duration = self.duration;
        let clusters = self.clusters.clone();
        let target = self.target;
        let clear_value = self.clear_value.clone();

        *guard = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            tracing::debug!("Reset timer expired, clearing {}", target.attribute);
            clusters.write_attribute(target.cluster_id, target.attribute, clear_value);
        }));
    }

    /// Cancel without firing
    pub fn cancel(&self) {
        let mut guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = guard.take() {
            handle.abort();
        }
    }

    /// Whether a timer task is currently scheduled
    #[must_use]
    pub fn is_active(&self) -> bool {
        let guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ResetTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
