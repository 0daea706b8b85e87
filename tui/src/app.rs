//! UI state for Tether.
//!
//! Only the UI thread touches [`App`]. Work runs on the task runtime and reaches the state
//! through callbacks posted to the UI queue, which the frame loop drains between renders.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, info, warn};

use tether_runtime::demo::{launch_fetch_fan_out, sleep_then_fetch};
use tether_runtime::{
    AbortHandle, Bridge, CancelReport, DemoSettings, FanInOptions, FanInSummary, ProgressSnapshot,
    SetCanceller, TaskError, TaskOutcome, fan_in,
};

/// Notices kept for the activity panel; older ones scroll away.
pub const MAX_NOTICES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// The single "async call" slot.
#[derive(Debug)]
pub enum AsyncCall {
    Idle,
    Running {
        abort: AbortHandle,
        started: Instant,
        abort_requested: bool,
    },
}

/// Lifecycle of the fan-out demo as the UI sees it.
#[derive(Debug)]
pub enum FanOutView {
    Idle,
    Running {
        canceller: SetCanceller,
        progress: ProgressSnapshot,
        started: Instant,
        cancel_requested: bool,
    },
    Finished {
        summary: FanInSummary,
        elapsed: Duration,
    },
}

/// Handles the UI needs to start work: the bridge into the runtime and the demo inputs.
pub struct Services {
    bridge: Bridge<App>,
    client: Client,
    settings: DemoSettings,
}

impl Services {
    #[must_use]
    pub fn new(bridge: Bridge<App>, client: Client, settings: DemoSettings) -> Self {
        Self {
            bridge,
            client,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &DemoSettings {
        &self.settings
    }

    #[must_use]
    pub fn bridge(&self) -> &Bridge<App> {
        &self.bridge
    }
}

#[derive(Debug)]
pub struct App {
    label: String,
    count: u64,
    async_call: AsyncCall,
    fan_out: FanOutView,
    notices: VecDeque<Notice>,
    tick: usize,
    high_contrast: bool,
    should_quit: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new(false)
    }
}

impl App {
    #[must_use]
    pub fn new(high_contrast: bool) -> Self {
        Self {
            label: "Press a, s or f to start".to_string(),
            count: 0,
            async_call: AsyncCall::Idle,
            fan_out: FanOutView::Idle,
            notices: VecDeque::with_capacity(MAX_NOTICES),
            tick: 0,
            high_contrast,
            should_quit: false,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn async_call(&self) -> &AsyncCall {
        &self.async_call
    }

    #[must_use]
    pub fn fan_out(&self) -> &FanOutView {
        &self.fan_out
    }

    pub fn notices(&self) -> impl DoubleEndedIterator<Item = &Notice> {
        self.notices.iter()
    }

    #[must_use]
    pub fn tick_count(&self) -> usize {
        self.tick
    }

    #[must_use]
    pub fn high_contrast(&self) -> bool {
        self.high_contrast
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// True while either demo still has work on the runtime.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self.async_call, AsyncCall::Running { .. })
            || matches!(self.fan_out, FanOutView::Running { .. })
    }

    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn request_quit(&mut self) {
        self.should_quit = true;
    }

    pub(crate) fn push_notice(&mut self, kind: NoticeKind, text: impl Into<String>) {
        if self.notices.len() == MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            kind,
            text: text.into(),
        });
    }

    /// Synchronous handler: runs entirely on the UI thread.
    pub fn click_sync(&mut self) {
        self.count += 1;
        self.label = format!("Count is: {}", self.count);
    }

    /// Sleep-gather then fetch, without blocking the UI. The label updates when it lands.
    pub fn start_async_call(&mut self, services: &Services) {
        if matches!(self.async_call, AsyncCall::Running { .. }) {
            self.push_notice(NoticeKind::Warning, "Async call already running");
            return;
        }

        let work = sleep_then_fetch(services.client.clone(), services.settings.clone());
        let abort = services.bridge.run(work, App::finish_async_call);
        info!(url = %services.settings.url, "Async call started");

        self.label = format!("Waiting for {}...", services.settings.url);
        self.async_call = AsyncCall::Running {
            abort,
            started: Instant::now(),
            abort_requested: false,
        };
    }

    pub fn abort_async_call(&mut self) {
        let notice = match &mut self.async_call {
            AsyncCall::Running {
                abort,
                abort_requested,
                ..
            } => {
                if *abort_requested {
                    return;
                }
                abort.abort();
                *abort_requested = true;
                "Aborting async call"
            }
            AsyncCall::Idle => "No async call running",
        };
        self.push_notice(NoticeKind::Info, notice);
    }

    pub(crate) fn finish_async_call(&mut self, outcome: TaskOutcome<String>) {
        let elapsed = match &self.async_call {
            AsyncCall::Running { started, .. } => Some(started.elapsed()),
            AsyncCall::Idle => None,
        };
        self.async_call = AsyncCall::Idle;
        debug!(?elapsed, ok = outcome.is_ok(), "Async call settled");

        match outcome {
            Ok(text) => self.label = text,
            Err(TaskError::Cancelled) => {
                self.label = "Async call cancelled".to_string();
                self.push_notice(NoticeKind::Info, "Async call cancelled");
            }
            Err(err) => {
                self.label = format!("Error: {err}");
                self.push_notice(NoticeKind::Error, format!("Async call failed: {err}"));
            }
        }
    }

    /// Launch the fetch fan-out and hand the fan-in to the runtime.
    ///
    /// Progress snapshots and the final summary come back through the UI queue in that
    /// order, so the summary is always the last word.
    pub fn start_fan_out(&mut self, services: &Services) {
        if matches!(self.fan_out, FanOutView::Running { .. }) {
            self.push_notice(NoticeKind::Warning, "Fan-out already running");
            return;
        }

        let settings = &services.settings;
        let set = match launch_fetch_fan_out(services.bridge.runtime(), &services.client, settings)
        {
            Ok(set) => set,
            Err(err) => {
                warn!("Fan-out launch failed: {err}");
                self.push_notice(NoticeKind::Error, format!("Fan-out failed: {err}"));
                return;
            }
        };

        let canceller = set.canceller();
        let total = set.len();
        let options = FanInOptions::new(settings.poll_interval).with_deadline(settings.overall_timeout);
        let ui = services.bridge.ui().clone();

        services.bridge.run(
            async move {
                let summary = fan_in(&set, options, |snapshot| {
                    // A closed queue means the UI is gone; the summary is dropped too.
                    let _ = ui.post(move |app: &mut App| app.record_progress(snapshot));
                })
                .await;
                Ok(summary)
            },
            App::finish_fan_out,
        );
        info!(tasks = total, url = %settings.url, "Fan-out started");

        self.label = format!("Fetching {} {total} times...", settings.url);
        self.fan_out = FanOutView::Running {
            canceller,
            progress: ProgressSnapshot::new(0, total),
            started: Instant::now(),
            cancel_requested: false,
        };
    }

    pub(crate) fn record_progress(&mut self, snapshot: ProgressSnapshot) {
        if let FanOutView::Running { progress, .. } = &mut self.fan_out {
            *progress = snapshot;
        }
    }

    pub(crate) fn finish_fan_out(&mut self, outcome: TaskOutcome<FanInSummary>) {
        let elapsed = match &self.fan_out {
            FanOutView::Running { started, .. } => started.elapsed(),
            FanOutView::Idle | FanOutView::Finished { .. } => Duration::ZERO,
        };

        match outcome {
            Ok(summary) => {
                let kind = if summary.failed > 0 {
                    NoticeKind::Error
                } else if summary.cancelled > 0 {
                    NoticeKind::Warning
                } else {
                    NoticeKind::Success
                };
                self.label = summary.to_string();
                self.push_notice(kind, summary.to_string());
                self.fan_out = FanOutView::Finished { summary, elapsed };
            }
            Err(err) => {
                self.push_notice(NoticeKind::Error, format!("Fan-out failed: {err}"));
                self.fan_out = FanOutView::Idle;
            }
        }
    }

    /// Cancel the running fan-out. Acknowledgment arrives as a notice once every task
    /// has stopped.
    pub fn cancel_fan_out(&mut self, services: &Services) {
        let canceller = match &mut self.fan_out {
            FanOutView::Running {
                canceller,
                cancel_requested,
                ..
            } => {
                if *cancel_requested {
                    return;
                }
                *cancel_requested = true;
                canceller.clone()
            }
            FanOutView::Idle | FanOutView::Finished { .. } => {
                self.push_notice(NoticeKind::Info, CancelReport::default().to_string());
                return;
            }
        };

        services.bridge.run(
            async move { Ok(canceller.cancel_all().await) },
            App::acknowledge_cancel,
        );
        self.push_notice(NoticeKind::Info, "Cancelling fan-out");
    }

    pub(crate) fn acknowledge_cancel(&mut self, outcome: TaskOutcome<CancelReport>) {
        match outcome {
            Ok(report) => self.push_notice(NoticeKind::Info, report.to_string()),
            Err(err) => self.push_notice(NoticeKind::Error, format!("Cancel failed: {err}")),
        }
    }

    /// Best-effort stop of everything still running, used on the way out.
    pub fn cancel_outstanding(&mut self) {
        if let AsyncCall::Running { abort, .. } = &self.async_call {
            abort.abort();
        }
        if let FanOutView::Running { canceller, .. } = &self.fan_out {
            let report = canceller.request();
            debug!(requested = report.requested, "Cancelled fan-out on exit");
        }
    }
}
