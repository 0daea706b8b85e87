//! Worker -> UI callback queue.
//!
//! Callbacks posted from the runtime are executed only when the UI thread drains the
//! queue, so UI state is never touched off the UI thread.

use thiserror::Error;
use tokio::sync::mpsc;

/// Upper bound on callbacks run per frame, so a burst never starves rendering.
pub const MAX_CALLBACKS_PER_FRAME: usize = 64;

type UiCallback<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("UI queue is closed")]
pub struct QueueClosed;

/// Posting side. Cheap to clone and safe to move onto the worker thread.
pub struct UiSender<S> {
    tx: mpsc::UnboundedSender<UiCallback<S>>,
}

impl<S> Clone for UiSender<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S> UiSender<S> {
    /// Schedule `callback` to run on the UI thread at the next drain.
    pub fn post<F>(&self, callback: F) -> Result<(), QueueClosed>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.tx.send(Box::new(callback)).map_err(|_| QueueClosed)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Draining side, owned by the UI loop.
pub struct UiQueue<S> {
    rx: mpsc::UnboundedReceiver<UiCallback<S>>,
}

impl<S> UiQueue<S> {
    /// Run up to `budget` queued callbacks against `state` without blocking.
    ///
    /// Returns the number of callbacks executed.
    pub fn drain(&mut self, state: &mut S, budget: usize) -> usize {
        let mut ran = 0;
        while ran < budget {
            match self.rx.try_recv() {
                Ok(callback) => {
                    callback(state);
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        ran
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Stop accepting new callbacks. Already-queued callbacks can still be drained.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[must_use]
pub fn channel<S>() -> (UiSender<S>, UiQueue<S>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UiSender { tx }, UiQueue { rx })
}
