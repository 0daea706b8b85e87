//! Task runtime for Tether.
//!
//! # Architecture
//!
//! ```text
//!   UI thread                                   worker thread (tokio current-thread)
//!   ─────────                                   ────────────────────────────────────
//!   Bridge::submit ──────── Handle::spawn ────> task (Abortable, state watch)
//!   launch(n) ───────────── Handle::spawn ────> task set ──> poll_until_done
//!   SetCanceller::request ─ AbortHandle ──────> tasks stop at next suspension point
//!   UiQueue::drain <──────── UiSender::post ──── outcomes, progress
//! ```
//!
//! The runtime's own thread is the only place tasks run. The UI thread only spawns,
//! requests cancellation, and drains the UI queue.

pub mod bridge;
pub mod cancel;
pub mod config;
pub mod demo;
pub mod fanout;
pub mod fetch;
pub mod task;
pub mod ui_queue;
pub mod worker;

pub use bridge::{Bridge, Submission};
pub use cancel::{SetCanceller, cancel_all};
pub use config::{ConfigError, DemoSettings, TetherConfig};
pub use fanout::{
    FanInOptions, LaunchError, MAX_TASK_SET_SIZE, MIN_POLL_INTERVAL, TaskSet, fan_in, launch,
    poll_until_done,
};
pub use fetch::{FetchSummary, build_client, fetch_summary};
pub use task::{TaskContext, TaskHandle, spawn_task};
pub use ui_queue::{MAX_CALLBACKS_PER_FRAME, QueueClosed, UiQueue, UiSender};
pub use worker::{RuntimeHandle, Worker, WorkerError};

pub use futures_util::future::AbortHandle;
pub use tether_types::{
    CancelReport, FanInSummary, ProgressSnapshot, TaskError, TaskId, TaskOutcome, TaskState,
};
