//! Core domain types for Tether.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from either side of the UI/runtime boundary.

mod ids;
mod progress;
mod task;

pub use ids::TaskId;
pub use progress::{CancelReport, FanInSummary, ProgressSnapshot};
pub use task::{TaskError, TaskOutcome, TaskState};
