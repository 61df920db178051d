//! Counting barrier over dynamically registered (fragment, worker) marks.
//!
//! [`WorkUnitBarrier`] tracks exactly-once completion of every work unit of a
//! job. Units are registered up front with [`WorkUnitBarrier::add_mark`];
//! workers report completion asynchronously, possibly more than once, and
//! [`WorkUnitBarrier::mark_done`] counts each unit down at most once. The
//! remaining count strictly decreases or is forced to zero by cancellation;
//! it never increases.
//!
//! Waiting is built on a watch channel carrying the remaining count, so a
//! waiter that races with the final `mark_done` still observes completion:
//! the channel holds the latest value rather than edge-triggered wakeups.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::types::{Status, WorkUnit};

/// Outcome of a bounded wait on the barrier.
///
/// A timeout is a first-class result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierWaitResult {
    /// All marks are done, or the barrier was force-drained.
    Completed,
    /// The timeout elapsed with marks still outstanding.
    TimedOut,
}

#[derive(Debug)]
struct BarrierInner {
    /// Registered units that have not completed yet.
    pending: HashSet<WorkUnit>,
    /// Units that already counted down, kept to absorb duplicate reports.
    done: HashSet<WorkUnit>,
    /// Terminal status recorded by the first force-drain, if any.
    forced: Option<Status>,
}

/// Counting synchronization barrier keyed by (fragment, worker) marks.
#[derive(Debug)]
pub struct WorkUnitBarrier {
    inner: Mutex<BarrierInner>,
    remaining_tx: watch::Sender<usize>,
}

impl WorkUnitBarrier {
    /// Creates a barrier expecting roughly `expected_units` marks.
    ///
    /// The count is a capacity hint; the authoritative set of units is built
    /// through [`WorkUnitBarrier::add_mark`] before counting begins.
    pub fn new(expected_units: usize) -> Self {
        let (remaining_tx, _) = watch::channel(0);
        Self {
            inner: Mutex::new(BarrierInner {
                pending: HashSet::with_capacity(expected_units),
                done: HashSet::with_capacity(expected_units),
                forced: None,
            }),
            remaining_tx,
        }
    }

    /// Registers one work unit before counting begins.
    ///
    /// Registering the same mark twice leaves the count unaffected, and
    /// registration after a force-drain is ignored.
    pub fn add_mark(&self, unit: WorkUnit) {
        let mut inner = self.inner.lock().expect("barrier lock poisoned");
        if inner.forced.is_some() || inner.done.contains(&unit) {
            return;
        }

        if inner.pending.insert(unit) {
            let remaining = inner.pending.len();
            self.remaining_tx.send_replace(remaining);
        }
    }

    /// Counts the given unit down exactly once.
    ///
    /// Returns `true` if this call completed the unit. A duplicate or
    /// unregistered mark is a no-op logged at debug level.
    pub fn mark_done(&self, unit: WorkUnit) -> bool {
        let mut inner = self.inner.lock().expect("barrier lock poisoned");
        if !inner.pending.remove(&unit) {
            debug!(%unit, "mark already done or unregistered, ignoring");
            return false;
        }

        inner.done.insert(unit);
        let remaining = inner.pending.len();
        self.remaining_tx.send_replace(remaining);
        true
    }

    /// Drains the remaining count to zero and records a terminal status.
    ///
    /// All waiters are released. Only the first force-drain records its
    /// status; later calls are no-ops.
    pub fn force_zero(&self, status: Status) {
        let mut inner = self.inner.lock().expect("barrier lock poisoned");
        if inner.forced.is_some() {
            debug!("barrier already force-drained, ignoring");
            return;
        }

        inner.forced = Some(status);
        inner.pending.clear();
        self.remaining_tx.send_replace(0);
    }

    /// Returns the number of outstanding marks.
    pub fn remaining(&self) -> usize {
        self.inner
            .lock()
            .expect("barrier lock poisoned")
            .pending
            .len()
    }

    /// Whether the barrier has reached zero, naturally or by force.
    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the status recorded by a force-drain, if one happened.
    pub fn forced_status(&self) -> Option<Status> {
        self.inner
            .lock()
            .expect("barrier lock poisoned")
            .forced
            .clone()
    }

    /// Waits until the remaining count reaches zero or the timeout elapses.
    ///
    /// Safe to call concurrently with [`WorkUnitBarrier::mark_done`] and
    /// [`WorkUnitBarrier::force_zero`] from other tasks: the watch channel
    /// retains the latest count, so the final decrement is never missed.
    pub async fn wait(&self, timeout: Duration) -> BarrierWaitResult {
        let mut remaining_rx = self.remaining_tx.subscribe();

        let completed = remaining_rx.wait_for(|remaining| *remaining == 0);
        let result = match tokio::time::timeout(timeout, completed).await {
            Ok(_) => BarrierWaitResult::Completed,
            Err(_) => BarrierWaitResult::TimedOut,
        };
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::types::{FragmentId, WorkerId};

    fn unit(fragment: i32, worker: i64) -> WorkUnit {
        WorkUnit::new(FragmentId(fragment), WorkerId(worker))
    }

    #[tokio::test]
    async fn test_mark_done_is_idempotent() {
        let barrier = WorkUnitBarrier::new(2);
        barrier.add_mark(unit(1, 7));
        barrier.add_mark(unit(2, 7));

        assert!(barrier.mark_done(unit(1, 7)));
        assert!(!barrier.mark_done(unit(1, 7)));
        assert!(!barrier.mark_done(unit(1, 7)));

        // The unrelated unit is still required to reach zero.
        assert_eq!(barrier.remaining(), 1);
        assert!(!barrier.is_done());

        assert!(barrier.mark_done(unit(2, 7)));
        assert!(barrier.is_done());
    }

    #[tokio::test]
    async fn test_unregistered_mark_is_ignored() {
        let barrier = WorkUnitBarrier::new(1);
        barrier.add_mark(unit(0, 1));

        assert!(!barrier.mark_done(unit(0, 99)));
        assert_eq!(barrier.remaining(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_count() {
        let barrier = WorkUnitBarrier::new(1);
        barrier.add_mark(unit(0, 1));
        barrier.add_mark(unit(0, 1));
        assert_eq!(barrier.remaining(), 1);

        // Registration after completion must not resurrect the unit.
        barrier.mark_done(unit(0, 1));
        barrier.add_mark(unit(0, 1));
        assert_eq!(barrier.remaining(), 0);
    }

    #[tokio::test]
    async fn test_wait_times_out_with_outstanding_marks() {
        let barrier = WorkUnitBarrier::new(1);
        barrier.add_mark(unit(0, 1));

        let result = barrier.wait(Duration::from_millis(20)).await;
        assert_eq!(result, BarrierWaitResult::TimedOut);
    }

    #[tokio::test]
    async fn test_concurrent_final_mark_wakes_waiter() {
        let barrier = Arc::new(WorkUnitBarrier::new(1));
        barrier.add_mark(unit(0, 1));

        let waiter = {
            let barrier = barrier.clone();
            tokio::spawn(async move { barrier.wait(Duration::from_secs(10)).await })
        };

        let marker = {
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.mark_done(unit(0, 1));
            })
        };

        marker.await.unwrap();
        let result = waiter.await.unwrap();
        assert_eq!(result, BarrierWaitResult::Completed);
    }

    #[tokio::test]
    async fn test_force_zero_releases_all_waiters() {
        let barrier = Arc::new(WorkUnitBarrier::new(3));
        for worker in 0..3 {
            barrier.add_mark(unit(0, worker));
        }

        let mut waiters = Vec::new();
        for _ in 0..4 {
            let barrier = barrier.clone();
            waiters.push(tokio::spawn(async move {
                barrier.wait(Duration::from_secs(30)).await
            }));
        }

        barrier.force_zero(Status::cancelled("user requested"));

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), BarrierWaitResult::Completed);
        }

        let forced = barrier.forced_status().unwrap();
        assert_eq!(forced.message(), "user requested");
    }

    #[tokio::test]
    async fn test_first_force_status_wins() {
        let barrier = WorkUnitBarrier::new(1);
        barrier.add_mark(unit(0, 1));

        barrier.force_zero(Status::cancelled("first"));
        barrier.force_zero(Status::internal_error("second"));

        assert_eq!(barrier.forced_status().unwrap().message(), "first");
    }

    #[tokio::test]
    async fn test_parallel_duplicate_marks_count_once() {
        let barrier = Arc::new(WorkUnitBarrier::new(2));
        barrier.add_mark(unit(1, 7));
        barrier.add_mark(unit(2, 5));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move { barrier.mark_done(unit(1, 7)) }));
        }

        let mut completions = 0;
        for handle in handles {
            if handle.await.unwrap() {
                completions += 1;
            }
        }

        assert_eq!(completions, 1);
        assert_eq!(barrier.remaining(), 1);
    }
}
