//! Dedicated worker thread hosting the task runtime.
//!
//! The UI thread never drives the runtime. It only holds a [`RuntimeHandle`], which can
//! spawn onto the worker from any thread and reports whether the worker is still alive.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use thiserror::Error;
use tokio::{
    runtime::{Builder, Handle},
    sync::oneshot,
};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to build task runtime: {0}")]
    Build(#[source] io::Error),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Cloneable, thread-safe access to the worker's scheduler.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    handle: Handle,
    alive: Arc<AtomicBool>,
}

impl RuntimeHandle {
    /// Handle onto an already-running tokio runtime (used when the caller owns the runtime).
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Handle onto the runtime driving the current task.
    ///
    /// Panics outside a tokio context, like [`Handle::current`].
    #[must_use]
    pub fn current() -> Self {
        Self::from_handle(Handle::current())
    }

    #[must_use]
    pub fn tokio(&self) -> &Handle {
        &self.handle
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

/// Owns the worker thread. Dropping it signals shutdown without waiting.
pub struct Worker {
    handle: RuntimeHandle,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    /// Build a current-thread runtime and start driving it on a new named thread.
    pub fn start(thread_name: &str) -> Result<Self, WorkerError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(WorkerError::Build)?;
        let handle = RuntimeHandle::from_handle(runtime.handle().clone());
        let alive = Arc::clone(&handle.alive);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                tracing::debug!("Task runtime started");
                runtime.block_on(async {
                    // Resolves on explicit shutdown or when the Worker is dropped.
                    let _ = shutdown_rx.await;
                });
                alive.store(false, Ordering::Release);
                // Dropping the runtime cancels every task still scheduled on it.
                drop(runtime);
                tracing::debug!("Task runtime stopped");
            })
            .map_err(WorkerError::Spawn)?;

        tracing::info!(thread = thread_name, "Worker thread started");
        Ok(Self {
            handle,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    #[must_use]
    pub fn handle(&self) -> &RuntimeHandle {
        &self.handle
    }

    /// Stop the runtime and wait for the worker thread to exit.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("Worker thread panicked during shutdown");
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Best-effort stop; do not block in Drop.
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
