//! UI thread <-> runtime bridge.
//!
//! `submit` schedules work on the worker and returns immediately. `on_complete` arranges
//! for a callback to receive the outcome on the UI thread, via the UI queue.
//!
//! ```text
//! UI thread                 worker thread
//! ─────────                 ─────────────
//! submit(work) ───spawn───> work runs ──┐
//! on_complete(sub, cb) ──spawn──> await outcome
//!                                       │
//! queue.drain() <──post(cb(outcome))────┘
//! ```

use std::future::Future;
use std::marker::PhantomData;

use futures_util::future::AbortHandle;

use tether_types::{TaskError, TaskId, TaskOutcome, TaskState};

use crate::task::{TaskHandle, spawn_task};
use crate::ui_queue::UiSender;
use crate::worker::RuntimeHandle;

enum Inner<T> {
    Spawned(TaskHandle<T>),
    /// The runtime was gone when the work was submitted.
    Rejected,
}

/// Pending result of a submitted unit of work.
///
/// Exactly one consumer: [`Bridge::on_complete`] takes it by value.
pub struct Submission<T> {
    inner: Inner<T>,
}

impl<T> Submission<T> {
    #[must_use]
    pub fn id(&self) -> Option<TaskId> {
        match &self.inner {
            Inner::Spawned(task) => Some(task.id()),
            Inner::Rejected => None,
        }
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        match &self.inner {
            Inner::Spawned(task) => task.state(),
            Inner::Rejected => TaskState::Failed,
        }
    }

    /// Handle that cancels this unit from any thread.
    ///
    /// The completion callback then receives [`TaskError::Cancelled`].
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        match &self.inner {
            Inner::Spawned(task) => task.abort_handle(),
            // Nothing to cancel; hand out a detached handle.
            Inner::Rejected => AbortHandle::new_pair().0,
        }
    }
}

/// Submits work to the runtime and marshals outcomes back to UI state `S`.
pub struct Bridge<S> {
    runtime: RuntimeHandle,
    ui: UiSender<S>,
}

impl<S> Clone for Bridge<S> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            ui: self.ui.clone(),
        }
    }
}

impl<S: 'static> Bridge<S> {
    #[must_use]
    pub fn new(runtime: RuntimeHandle, ui: UiSender<S>) -> Self {
        Self { runtime, ui }
    }

    #[must_use]
    pub fn runtime(&self) -> &RuntimeHandle {
        &self.runtime
    }

    /// Sender for posting intermediate updates (progress) to the UI.
    #[must_use]
    pub fn ui(&self) -> &UiSender<S> {
        &self.ui
    }

    /// Schedule `work` on the runtime. Never blocks; safe from any thread.
    pub fn submit<T, Fut>(&self, work: Fut) -> Submission<T>
    where
        T: Send + 'static,
        Fut: Future<Output = TaskOutcome<T>> + Send + 'static,
    {
        if !self.runtime.is_alive() {
            tracing::warn!("Submit rejected: task runtime is not running");
            return Submission {
                inner: Inner::Rejected,
            };
        }
        let task = spawn_task(&self.runtime, |_ctx| work);
        tracing::debug!(task = %task.id(), "Submitted work");
        Submission {
            inner: Inner::Spawned(task),
        }
    }

    /// Run `callback` on the UI thread once `submission` resolves.
    ///
    /// Fires exactly once: with the value, the error, or [`TaskError::Cancelled`]. If the
    /// runtime stops first it fires with [`TaskError::RuntimeUnavailable`].
    pub fn on_complete<T, C>(&self, submission: Submission<T>, callback: C)
    where
        T: Send + 'static,
        C: FnOnce(&mut S, TaskOutcome<T>) + Send + 'static,
    {
        let delivery = Delivery::new(self.ui.clone(), submission.id(), callback);
        let task = match submission.inner {
            Inner::Spawned(task) if self.runtime.is_alive() => task,
            Inner::Spawned(_) | Inner::Rejected => {
                delivery.complete(Err(TaskError::RuntimeUnavailable));
                return;
            }
        };

        // A runtime that stops first drops this future, and with it the delivery.
        self.runtime.tokio().spawn(async move {
            let outcome = task.join().await;
            delivery.complete(outcome);
        });
    }

    /// `submit` + `on_complete`. Returns a handle for cancelling the unit.
    pub fn run<T, Fut, C>(&self, work: Fut, callback: C) -> AbortHandle
    where
        T: Send + 'static,
        Fut: Future<Output = TaskOutcome<T>> + Send + 'static,
        C: FnOnce(&mut S, TaskOutcome<T>) + Send + 'static,
    {
        let submission = self.submit(work);
        let abort = submission.abort_handle();
        self.on_complete(submission, callback);
        abort
    }
}

/// Owns a completion callback until it has been posted.
///
/// Dropped undelivered, it posts [`TaskError::RuntimeUnavailable`] instead.
struct Delivery<S, T, C>
where
    S: 'static,
    T: Send + 'static,
    C: FnOnce(&mut S, TaskOutcome<T>) + Send + 'static,
{
    ui: UiSender<S>,
    id: Option<TaskId>,
    callback: Option<C>,
    outcome: PhantomData<fn() -> T>,
}

impl<S, T, C> Delivery<S, T, C>
where
    S: 'static,
    T: Send + 'static,
    C: FnOnce(&mut S, TaskOutcome<T>) + Send + 'static,
{
    fn new(ui: UiSender<S>, id: Option<TaskId>, callback: C) -> Self {
        Self {
            ui,
            id,
            callback: Some(callback),
            outcome: PhantomData,
        }
    }

    fn complete(mut self, outcome: TaskOutcome<T>) {
        self.post(outcome);
    }

    fn post(&mut self, outcome: TaskOutcome<T>) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        let id = self.id;
        if let Err(err) = &outcome
            && !err.is_cancelled()
        {
            tracing::warn!(task = ?id, "Submitted work failed: {err}");
        }
        if self.ui.post(move |state| callback(state, outcome)).is_err() {
            tracing::debug!(task = ?id, "UI queue closed; dropping outcome");
        }
    }
}

impl<S, T, C> Drop for Delivery<S, T, C>
where
    S: 'static,
    T: Send + 'static,
    C: FnOnce(&mut S, TaskOutcome<T>) + Send + 'static,
{
    fn drop(&mut self) {
        if self.callback.is_some() {
            self.post(Err(TaskError::RuntimeUnavailable));
        }
    }
}
