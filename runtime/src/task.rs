//! Spawning and observing individual tasks.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::future::{AbortHandle, Abortable, FutureExt};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

use tether_types::{TaskError, TaskId, TaskOutcome, TaskState};

use crate::worker::RuntimeHandle;

/// What a running task can see about itself.
#[derive(Debug, Clone)]
pub struct TaskContext {
    id: TaskId,
    abort: AbortHandle,
}

impl TaskContext {
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// True once cancellation was requested. The task stops at its next suspension
    /// point regardless; long synchronous stretches can check this explicitly.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.abort.is_aborted()
    }
}

/// Owning handle to one spawned task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: TaskId,
    state: watch::Receiver<TaskState>,
    abort: AbortHandle,
    join: JoinHandle<TaskOutcome<T>>,
}

impl<T> TaskHandle<T> {
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        observe(&self.state)
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state().is_terminal()
    }

    /// Ask the task to stop. Returns `false` if it had already settled.
    pub fn request_cancel(&self) -> bool {
        if self.is_settled() {
            return false;
        }
        self.abort.abort();
        true
    }

    /// Wait until the task reaches a terminal state without consuming its outcome.
    pub async fn settled(&self) -> TaskState {
        wait_settled(self.state.clone()).await
    }

    /// Wait for the task's outcome.
    pub async fn join(self) -> TaskOutcome<T> {
        outcome_from_join(self.join.await)
    }

    pub(crate) fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub(crate) fn state_receiver(&self) -> watch::Receiver<TaskState> {
        self.state.clone()
    }
}

/// Spawn a cancellable task on `runtime`.
///
/// `make` receives the task's [`TaskContext`] and returns the work. The work is wrapped so
/// that cancellation resolves to [`TaskError::Cancelled`], a panic resolves to
/// [`TaskError::Panicked`], and the task records its own terminal state.
pub fn spawn_task<T, F, Fut>(runtime: &RuntimeHandle, make: F) -> TaskHandle<T>
where
    T: Send + 'static,
    F: FnOnce(TaskContext) -> Fut,
    Fut: Future<Output = TaskOutcome<T>> + Send + 'static,
{
    let id = TaskId::next();
    let (state_tx, state_rx) = watch::channel(TaskState::Pending);
    let (abort, registration) = AbortHandle::new_pair();

    let work = make(TaskContext {
        id,
        abort: abort.clone(),
    });
    let abortable = Abortable::new(work, registration);
    let abort_for_task = abort.clone();

    let join = runtime.tokio().spawn(async move {
        if !abort_for_task.is_aborted() {
            state_tx.send_replace(TaskState::Running);
        }

        let outcome = match AssertUnwindSafe(abortable).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_aborted)) => Err(TaskError::Cancelled),
            Err(payload) => {
                let message = panic_payload_to_string(&payload);
                tracing::warn!(task = %id, "Task panicked: {message}");
                Err(TaskError::Panicked(message))
            }
        };

        let settled = TaskState::settled(&outcome);
        tracing::debug!(task = %id, state = %settled, "Task settled");
        state_tx.send_replace(settled);
        outcome
    });

    TaskHandle {
        id,
        state: state_rx,
        abort,
        join,
    }
}

/// Current state, treating a task dropped by runtime shutdown as cancelled.
pub(crate) fn observe(rx: &watch::Receiver<TaskState>) -> TaskState {
    let state = *rx.borrow();
    if !state.is_terminal() && rx.has_changed().is_err() {
        return TaskState::Cancelled;
    }
    state
}

pub(crate) async fn wait_settled(mut rx: watch::Receiver<TaskState>) -> TaskState {
    // Err means the task was dropped without reporting (runtime shutdown).
    let _ = rx.wait_for(|state| state.is_terminal()).await;
    observe(&rx)
}

pub(crate) fn outcome_from_join<T>(joined: Result<TaskOutcome<T>, JoinError>) -> TaskOutcome<T> {
    match joined {
        Ok(outcome) => outcome,
        Err(err) if err.is_panic() => {
            Err(TaskError::Panicked(panic_payload_to_string(&err.into_panic())))
        }
        // The wrapper never aborts through tokio, so this is runtime shutdown.
        Err(_) => Err(TaskError::RuntimeUnavailable),
    }
}

fn panic_payload_to_string(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
