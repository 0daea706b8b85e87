//! Fan-out progress and completion reports.

use std::fmt;

use crate::TaskState;

/// Point-in-time view of a task set, taken once per poll interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgressSnapshot {
    done: usize,
    pending: usize,
}

impl ProgressSnapshot {
    #[must_use]
    pub const fn new(done: usize, pending: usize) -> Self {
        Self { done, pending }
    }

    /// Count terminal vs non-terminal states.
    pub fn from_states(states: impl IntoIterator<Item = TaskState>) -> Self {
        let (mut done, mut pending) = (0, 0);
        for state in states {
            if state.is_terminal() {
                done += 1;
            } else {
                pending += 1;
            }
        }
        Self { done, pending }
    }

    #[must_use]
    pub const fn done(self) -> usize {
        self.done
    }

    #[must_use]
    pub const fn pending(self) -> usize {
        self.pending
    }

    #[must_use]
    pub const fn total(self) -> usize {
        self.done + self.pending
    }

    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.pending == 0
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} done, {} pending", self.done, self.pending)
    }
}

/// Aggregate completion signal returned once every task in a set has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FanInSummary {
    pub completed: usize,
    pub cancelled: usize,
    pub failed: usize,
}

impl FanInSummary {
    /// Tally terminal states. Non-terminal states are not counted.
    pub fn from_states(states: impl IntoIterator<Item = TaskState>) -> Self {
        let mut summary = Self::default();
        for state in states {
            match state {
                TaskState::Completed => summary.completed += 1,
                TaskState::Cancelled => summary.cancelled += 1,
                TaskState::Failed => summary.failed += 1,
                TaskState::Pending | TaskState::Running => {}
            }
        }
        summary
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.completed + self.cancelled + self.failed
    }
}

impl fmt::Display for FanInSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Finished {} tasks: {} completed, {} cancelled, {} failed",
            self.total(),
            self.completed,
            self.cancelled,
            self.failed
        )
    }
}

/// Acknowledgment of a cancellation sweep over a task set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CancelReport {
    /// Tasks that were still unresolved and received a cancellation request.
    pub requested: usize,
    /// Tasks that had already settled and were skipped.
    pub already_settled: usize,
}

impl CancelReport {
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.requested == 0
    }
}

impl fmt::Display for CancelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_noop() {
            return f.write_str("Nothing to cancel");
        }
        write!(
            f,
            "Cancelled {} tasks ({} had already finished)",
            self.requested, self.already_settled
        )
    }
}
