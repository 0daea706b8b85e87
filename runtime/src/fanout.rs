//! Fan-out/fan-in coordination over a fixed set of tasks.
//!
//! ```text
//! launch(n) ──> TaskSet ──> poll_until_done(interval) ──> ProgressSnapshot*
//!                  │                                          │
//!                  └── canceller() ── cancel_all ─────────────┘ (observed as done)
//! ```

use std::future::Future;
use std::pin::pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt, stream};
use thiserror::Error;
use tokio::time::{Instant, timeout, timeout_at};

use tether_types::{FanInSummary, ProgressSnapshot, TaskId, TaskOutcome, TaskState};

use crate::cancel::{SetCanceller, cancel_all};
use crate::task::{TaskContext, TaskHandle, spawn_task};
use crate::worker::RuntimeHandle;

/// Hard cap on the size of a single task set.
pub const MAX_TASK_SET_SIZE: usize = 1024;

/// Shorter poll intervals are raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error("cannot launch {requested} tasks (limit {limit})")]
    TooManyTasks { requested: usize, limit: usize },
    #[error("task runtime is not running")]
    RuntimeUnavailable,
}

/// Tasks launched together. Membership is fixed once launched.
#[derive(Debug)]
pub struct TaskSet<T> {
    tasks: Vec<TaskHandle<T>>,
}

impl<T> TaskSet<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks.iter().map(TaskHandle::id)
    }

    pub fn states(&self) -> impl Iterator<Item = TaskState> + '_ {
        self.tasks.iter().map(TaskHandle::state)
    }

    pub fn tasks(&self) -> &[TaskHandle<T>] {
        &self.tasks
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::from_states(self.states())
    }

    #[must_use]
    pub fn summary(&self) -> FanInSummary {
        FanInSummary::from_states(self.states())
    }

    /// Opaque handle that can cancel this set from any thread.
    #[must_use]
    pub fn canceller(&self) -> SetCanceller {
        SetCanceller::new(
            self.tasks
                .iter()
                .map(|task| (task.abort_handle(), task.state_receiver())),
        )
    }

    /// Wait until every task has reached a terminal state.
    pub async fn settled(&self) {
        for task in &self.tasks {
            task.settled().await;
        }
    }

    /// Collect every outcome, in launch order.
    pub async fn join_all(self) -> Vec<(TaskId, TaskOutcome<T>)> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        for task in self.tasks {
            let id = task.id();
            outcomes.push((id, task.join().await));
        }
        outcomes
    }
}

/// Create and start `n` tasks immediately.
///
/// `factory` is called once per index with that task's context. Tasks run concurrently
/// and complete in no particular order.
pub fn launch<T, F, Fut>(
    runtime: &RuntimeHandle,
    n: usize,
    mut factory: F,
) -> Result<TaskSet<T>, LaunchError>
where
    T: Send + 'static,
    F: FnMut(usize, TaskContext) -> Fut,
    Fut: Future<Output = TaskOutcome<T>> + Send + 'static,
{
    if n > MAX_TASK_SET_SIZE {
        return Err(LaunchError::TooManyTasks {
            requested: n,
            limit: MAX_TASK_SET_SIZE,
        });
    }
    if !runtime.is_alive() {
        return Err(LaunchError::RuntimeUnavailable);
    }

    let tasks = (0..n)
        .map(|index| spawn_task(runtime, |ctx| factory(index, ctx)))
        .collect();
    tracing::debug!(tasks = n, "Launched task set");
    Ok(TaskSet { tasks })
}

enum PollPhase {
    Polling,
    Finished,
}

/// Poll the set's collective completion, waiting at most `interval` per poll.
///
/// Yields a snapshot after every poll that still leaves tasks pending, then one final
/// snapshot with nothing pending, then ends. An empty set yields nothing. The stream only
/// borrows the set, so it can run alongside a cancellation sweep; cancelled tasks count as
/// done at the next poll. `interval` is at least [`MIN_POLL_INTERVAL`].
pub fn poll_until_done<T>(
    set: &TaskSet<T>,
    interval: Duration,
) -> impl Stream<Item = ProgressSnapshot> + '_ {
    let interval = interval.max(MIN_POLL_INTERVAL);
    stream::unfold(PollPhase::Polling, move |phase| async move {
        if matches!(phase, PollPhase::Finished) || set.is_empty() {
            return None;
        }

        // Elapsed is the normal "still working" path, not an error.
        let _ = timeout(interval, set.settled()).await;

        let snapshot = set.snapshot();
        let next = if snapshot.is_complete() {
            PollPhase::Finished
        } else {
            PollPhase::Polling
        };
        Some((snapshot, next))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanInOptions {
    pub poll_interval: Duration,
    /// Cancel whatever is still running once this much time has passed. A deadline
    /// beyond what the clock can represent never fires.
    pub deadline: Option<Duration>,
}

impl FanInOptions {
    #[must_use]
    pub const fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            deadline: None,
        }
    }

    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Drive [`poll_until_done`] to the end, reporting each snapshot, and summarize.
pub async fn fan_in<T, P>(set: &TaskSet<T>, options: FanInOptions, mut on_progress: P) -> FanInSummary
where
    P: FnMut(ProgressSnapshot),
{
    let mut deadline = options
        .deadline
        .and_then(|limit| Instant::now().checked_add(limit));
    let mut progress = pin!(poll_until_done(set, options.poll_interval));

    loop {
        let next = match deadline {
            Some(at) => match timeout_at(at, progress.next()).await {
                Ok(next) => next,
                Err(_elapsed) => {
                    let report = cancel_all(set).await;
                    tracing::warn!(
                        cancelled = report.requested,
                        "Fan-in deadline reached; cancelled remaining tasks"
                    );
                    deadline = None;
                    continue;
                }
            },
            None => progress.next().await,
        };

        match next {
            Some(snapshot) => {
                tracing::debug!(done = snapshot.done(), pending = snapshot.pending(), "Fan-in progress");
                on_progress(snapshot);
            }
            None => break,
        }
    }

    let summary = set.summary();
    tracing::info!(
        completed = summary.completed,
        cancelled = summary.cancelled,
        failed = summary.failed,
        "Fan-in finished"
    );
    summary
}
