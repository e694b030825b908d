//! Shutdown Coordinator - Bounded wait, best-effort close
//!
//! TigerStyle: Poll a shared completion count, never block forever.
//!
//! Each suite holds a `CompletionSignal` that bumps the shared count once,
//! either explicitly or when dropped. The coordinator polls the count every
//! `poll_interval`; when the expected number of suites has finished, or the
//! retry budget is spent, it closes the store. Closing happens exactly once
//! and never fails the caller.
//!
//! ```text
//!   suite A ──signal──┐
//!   suite B ──signal──┼──→ CompletionTracker (AtomicUsize)
//!   suite C ──signal──┘            ↑ poll every 500 ms
//!                          ShutdownCoordinator ──→ store.close()
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage::{BackendError, EntityStore};
use crate::{SHUTDOWN_POLL_INTERVAL_MS_DEFAULT, SHUTDOWN_RETRY_COUNT_MAX_DEFAULT};

// =============================================================================
// Completion Tracking
// =============================================================================

/// Shared count of finished suites.
#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    completed: Arc<AtomicUsize>,
}

impl CompletionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal for one suite run.
    #[must_use]
    pub fn signal(&self, suite: &str) -> CompletionSignal {
        CompletionSignal {
            suite: suite.to_string(),
            completed: Arc::clone(&self.completed),
            fired: AtomicBool::new(false),
        }
    }

    /// Suites finished so far.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

/// Fires once: on `complete()`, or on drop if never completed.
#[derive(Debug)]
pub struct CompletionSignal {
    suite: String,
    completed: Arc<AtomicUsize>,
    fired: AtomicBool,
}

impl CompletionSignal {
    /// Mark the suite finished.
    pub fn complete(self) {
        self.fire();
    }

    fn fire(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            let total = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::debug!(suite = %self.suite, completed = total, "suite completion signalled");
        }
    }
}

impl Drop for CompletionSignal {
    fn drop(&mut self) {
        self.fire();
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// How long the coordinator waits before closing anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownPolicy {
    /// Delay between completion polls
    #[serde(with = "millis")]
    pub poll_interval: Duration,
    /// Polls allowed after the first before closing regardless
    pub retry_limit: u32,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(SHUTDOWN_POLL_INTERVAL_MS_DEFAULT),
            retry_limit: SHUTDOWN_RETRY_COUNT_MAX_DEFAULT,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// What happened at shutdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownReport {
    /// Every expected suite finished before the close
    pub confirmed: bool,
    pub completed: usize,
    pub expected: usize,
    /// Polls spent waiting
    pub retries: u32,
    /// Error from `close`, logged and otherwise ignored
    pub close_error: Option<BackendError>,
}

/// Waits for suites to finish, then closes the store.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    tracker: CompletionTracker,
    policy: ShutdownPolicy,
}

impl ShutdownCoordinator {
    #[must_use]
    pub fn new(tracker: CompletionTracker, policy: ShutdownPolicy) -> Self {
        Self { tracker, policy }
    }

    /// Wait until `expected` suites have completed or the retry budget is
    /// exceeded, then close `store` once.
    pub async fn close(&self, store: &dyn EntityStore, expected: usize) -> ShutdownReport {
        let mut retries = 0u32;

        let confirmed = loop {
            let completed = self.tracker.completed();
            if completed >= expected {
                break true;
            }
            if retries > self.policy.retry_limit {
                tracing::warn!(
                    completed,
                    expected,
                    retries,
                    "suites still running, closing store anyway"
                );
                break false;
            }
            retries += 1;
            tokio::time::sleep(self.policy.poll_interval).await;
        };

        let close_error = match store.close().await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(backend = store.name(), error = %e, "store close failed");
                Some(e)
            }
        };

        let report = ShutdownReport {
            confirmed,
            completed: self.tracker.completed(),
            expected,
            retries,
            close_error,
        };
        tracing::info!(
            backend = store.name(),
            confirmed = report.confirmed,
            completed = report.completed,
            expected = report.expected,
            "[Close test]"
        );
        report
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Operation};

    #[test]
    fn test_signal_fires_once() {
        let tracker = CompletionTracker::new();
        tracker.signal("basic").complete();
        assert_eq!(tracker.completed(), 1);

        drop(tracker.signal("sort"));
        assert_eq!(tracker.completed(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closes_immediately_when_all_done() {
        let tracker = CompletionTracker::new();
        tracker.signal("basic").complete();
        let store = MemoryStore::new();

        let report = ShutdownCoordinator::new(tracker, ShutdownPolicy::default())
            .close(&store, 1)
            .await;

        assert!(report.confirmed);
        assert_eq!(report.retries, 0);
        assert!(store.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_late_suite() {
        let tracker = CompletionTracker::new();
        let signal = tracker.signal("limits");
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1_200)).await;
            signal.complete();
        });

        let store = MemoryStore::new();
        let report = ShutdownCoordinator::new(tracker, ShutdownPolicy::default())
            .close(&store, 1)
            .await;

        assert!(report.confirmed);
        assert_eq!(report.retries, 3);
        assert!(store.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_retry_limit() {
        let tracker = CompletionTracker::new();
        let store = MemoryStore::new();
        let policy = ShutdownPolicy {
            poll_interval: Duration::from_millis(500),
            retry_limit: 10,
        };

        let started = tokio::time::Instant::now();
        let report = ShutdownCoordinator::new(tracker, policy)
            .close(&store, 2)
            .await;

        assert!(!report.confirmed);
        assert_eq!(report.retries, 11);
        assert_eq!(started.elapsed(), Duration::from_millis(5_500));
        assert!(store.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_error_is_reported_not_raised() {
        let tracker = CompletionTracker::new();
        let store = MemoryStore::new();
        store.inject_fault(Operation::Close).await;

        let report = ShutdownCoordinator::new(tracker, ShutdownPolicy::default())
            .close(&store, 0)
            .await;

        assert!(report.confirmed);
        assert_eq!(report.close_error, Some(BackendError::injected("close")));
    }
}
