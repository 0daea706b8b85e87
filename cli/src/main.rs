//! Tether CLI - Binary entry point and terminal session management.
//!
//! # Architecture
//!
//! The main thread is the UI thread. It never awaits: async work goes to the task runtime
//! on its own worker thread, and results come back through the UI queue.
//!
//! ```text
//! main() -> Worker::start() -> TerminalSession::new() -> run_app() -> App + TUI
//!                 |                                          ^
//!                 v                                          |
//!           task runtime ───────── UiQueue::drain ───────────┘
//! ```
//!
//! # Event Loop
//!
//! Each frame, on a fixed cadence (`[app] tick_ms`, 16ms by default):
//!
//! 1. Drain input queue (non-blocking via [`tether_tui::InputPump`])
//! 2. Drain runtime callbacks (at most [`MAX_CALLBACKS_PER_FRAME`])
//! 3. Advance spinner state (`app.tick()`)
//! 4. Render frame
//! 5. Sleep until the next tick

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::{
    fs::{self, File, OpenOptions},
    io::{Stdout, stdout},
    path::PathBuf,
    sync::Mutex,
    thread,
    time::{Duration, Instant},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tether_runtime::config::{DEFAULT_TICK, DEFAULT_WORKER_THREAD_NAME};
use tether_runtime::{
    Bridge, DemoSettings, MAX_CALLBACKS_PER_FRAME, TetherConfig, UiQueue, Worker, build_client,
    ui_queue,
};
use tether_tui::{App, InputPump, Services, draw, handle_events};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // Without a log file, drop logs rather than writing over the TUI.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.tether/logs/tether.log
    if let Some(config_path) = TetherConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("tether.log"));
    }

    // Fallback: ./.tether/logs/tether.log
    candidates.push(PathBuf::from(".tether").join("logs").join("tether.log"));

    candidates
}

/// RAII wrapper for terminal state: raw mode and the alternate screen.
///
/// On drop the terminal is restored, even after panics or early returns.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self> {
        enable_raw_mode()?;

        let mut out = stdout();
        if let Err(err) = execute!(out, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err.into());
        }

        match Terminal::new(CrosstermBackend::new(out)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(err) => {
                let _ = disable_raw_mode();
                let _ = execute!(stdout(), LeaveAlternateScreen);
                Err(err.into())
            }
        }
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

fn main() -> Result<()> {
    init_tracing();

    let config = TetherConfig::load().unwrap_or_else(|err| {
        tracing::warn!(path = %err.path().display(), "Using default config: {err}");
        None
    });
    let settings = DemoSettings::from_config(config.as_ref());
    let tick = config.as_ref().map_or(DEFAULT_TICK, TetherConfig::tick_interval);
    let thread_name = config.as_ref().map_or_else(
        || DEFAULT_WORKER_THREAD_NAME.to_string(),
        TetherConfig::worker_thread_name,
    );
    let high_contrast = config.as_ref().is_some_and(TetherConfig::high_contrast);

    let worker = Worker::start(&thread_name).context("failed to start task runtime")?;
    let client = build_client(&settings).context("failed to build HTTP client")?;
    tracing::info!(url = %settings.url, fan_out = settings.fan_out, "Demo configured");

    let (ui_tx, mut queue) = ui_queue::channel::<App>();
    let services = Services::new(
        Bridge::new(worker.handle().clone(), ui_tx),
        client,
        settings,
    );
    let mut app = App::new(high_contrast);

    let result = TerminalSession::new().and_then(|mut session| {
        run_app(&mut session.terminal, &mut app, &services, &mut queue, tick)
    });

    app.cancel_outstanding();
    queue.close();
    worker.shutdown();

    if let Err(err) = &result {
        eprintln!("Error: {err:?}");
    }
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    services: &Services,
    queue: &mut UiQueue<App>,
    tick: Duration,
) -> Result<()> {
    let mut input = InputPump::new()?;
    let mut next_frame = Instant::now();

    let result: Result<()> = loop {
        // Non-blocking input (drain queue only)
        match handle_events(app, services, &mut input) {
            Ok(true) => break Ok(()),
            Ok(false) => {}
            Err(e) => break Err(e),
        }

        queue.drain(app, MAX_CALLBACKS_PER_FRAME);
        app.tick();

        if let Err(e) = terminal.draw(|frame| draw(frame, app)) {
            break Err(e.into());
        }

        // Missed ticks are skipped, not replayed.
        next_frame += tick;
        let now = Instant::now();
        if next_frame > now {
            thread::sleep(next_frame - now);
        } else {
            next_frame = now;
        }
    };

    input.shutdown();
    result
}
