//! Cooperative cancellation of a task set.

use std::sync::Arc;

use futures_util::future::AbortHandle;
use tokio::sync::watch;

use tether_types::{CancelReport, TaskState};

use crate::fanout::TaskSet;
use crate::task::{observe, wait_settled};

#[derive(Debug)]
struct Entry {
    abort: AbortHandle,
    state: watch::Receiver<TaskState>,
}

/// Cancels a task set without owning it.
///
/// Holds only abort handles and state watchers, so the UI can keep one while the set
/// itself stays with the coordinator that launched it.
#[derive(Debug, Clone)]
pub struct SetCanceller {
    entries: Arc<[Entry]>,
}

impl SetCanceller {
    pub(crate) fn new(
        entries: impl IntoIterator<Item = (AbortHandle, watch::Receiver<TaskState>)>,
    ) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(abort, state)| Entry { abort, state })
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Request cancellation of every unresolved task and return immediately.
    ///
    /// Settled tasks are skipped. Requests are advisory: each task stops at its next
    /// suspension point.
    pub fn request(&self) -> CancelReport {
        let mut report = CancelReport::default();
        for entry in self.entries.iter() {
            if observe(&entry.state).is_terminal() {
                report.already_settled += 1;
            } else {
                entry.abort.abort();
                report.requested += 1;
            }
        }
        report
    }

    /// Request cancellation and wait until every targeted task has acknowledged it by
    /// reaching a terminal state.
    pub async fn cancel_all(&self) -> CancelReport {
        let report = self.request();
        for entry in self.entries.iter() {
            wait_settled(entry.state.clone()).await;
        }
        tracing::debug!(
            requested = report.requested,
            already_settled = report.already_settled,
            "Cancellation acknowledged"
        );
        report
    }
}

/// Cancel every unresolved task in `set` and wait for acknowledgment.
pub async fn cancel_all<T>(set: &TaskSet<T>) -> CancelReport {
    set.canceller().cancel_all().await
}

#[cfg(test)]
mod tests {
    use super::cancel_all;
    use crate::fanout::{launch, poll_until_done};
    use crate::worker::RuntimeHandle;
    use futures_util::StreamExt;
    use std::time::Duration;
    use tether_types::{TaskError, TaskState};
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn cancel_all_before_completion_resolves_every_task_cancelled() {
        let rt = RuntimeHandle::current();
        let set = launch(&rt, 10, |i, _ctx| async move {
            sleep(Duration::from_secs(10 + i as u64)).await;
            Ok::<_, TaskError>(i)
        })
        .unwrap();
        tokio::task::yield_now().await;

        let report = cancel_all(&set).await;
        assert_eq!(report.requested, 10);
        assert_eq!(report.already_settled, 0);
        assert!(set.states().all(|s| s == TaskState::Cancelled));

        let snapshots: Vec<_> = poll_until_done(&set, Duration::from_secs(2))
            .collect()
            .await;
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].done(), 10);

        for (_, outcome) in set.join_all().await {
            assert_eq!(outcome, Err(TaskError::Cancelled));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_on_resolved_set_is_noop() {
        let rt = RuntimeHandle::current();
        let set = launch(&rt, 3, |i, _ctx| async move { Ok::<_, TaskError>(i) }).unwrap();
        set.settled().await;

        let report = cancel_all(&set).await;
        assert!(report.is_noop());
        assert_eq!(report.already_settled, 3);
        assert!(set.states().all(|s| s == TaskState::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_poll_is_observed_as_done() {
        let rt = RuntimeHandle::current();
        let set = launch(&rt, 5, |i, _ctx| async move {
            // Task 0 finishes quickly, the rest would run for an hour.
            let delay = if i == 0 { 1 } else { 3600 };
            sleep(Duration::from_secs(delay)).await;
            Ok::<_, TaskError>(i)
        })
        .unwrap();
        let canceller = set.canceller();

        let cancel_later = async {
            sleep(Duration::from_secs(3)).await;
            canceller.cancel_all().await
        };
        let poll = poll_until_done(&set, Duration::from_secs(2)).collect::<Vec<_>>();
        let (report, snapshots) = tokio::join!(cancel_later, poll);

        assert_eq!(report.requested, 4);
        assert_eq!(report.already_settled, 1);
        assert_eq!(snapshots.first().map(|s| s.done()), Some(1));
        assert_eq!(snapshots.last().map(|s| s.done()), Some(5));

        let summary = set.summary();
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.cancelled, 4);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn request_is_non_blocking_and_repeatable() {
        let rt = RuntimeHandle::current();
        let set = launch(&rt, 2, |_, _ctx| async {
            sleep(Duration::from_secs(60)).await;
            Ok::<_, TaskError>(())
        })
        .unwrap();
        let canceller = set.canceller();
        assert_eq!(canceller.len(), 2);

        let first = canceller.request();
        assert_eq!(first.requested, 2);
        set.settled().await;

        let second = canceller.request();
        assert!(second.is_noop());
        assert_eq!(second.already_settled, 2);
    }
}
