//! Input handling for Tether TUI.

use anyhow::{Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::debug;

use crate::app::{App, Services};

const INPUT_POLL_TIMEOUT: Duration = Duration::from_millis(25); // shutdown responsiveness
const INPUT_CHANNEL_CAPACITY: usize = 1024; // bounded: no OOM
const MAX_EVENTS_PER_FRAME: usize = 64; // never starve rendering

enum InputMsg {
    Event(Event),
    Error(String),
}

/// Reads terminal events on a dedicated thread so the frame loop only ever drains a queue.
pub struct InputPump {
    rx: mpsc::Receiver<InputMsg>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl InputPump {
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let stop2 = stop.clone();

        let join = thread::Builder::new()
            .name("tether-input".to_string())
            .spawn(move || input_loop(&stop2, &tx))?;
        Ok(Self {
            rx,
            stop,
            join: Some(join),
        })
    }

    pub fn shutdown(&mut self) {
        // Close first so a reader blocked on a full channel wakes up.
        self.rx.close();

        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for InputPump {
    fn drop(&mut self) {
        // Best-effort stop if caller exits early; do not block in Drop.
        self.rx.close();
        self.stop.store(true, Ordering::Release);
    }
}

fn input_loop(stop: &AtomicBool, tx: &mpsc::Sender<InputMsg>) {
    while !stop.load(Ordering::Acquire) {
        match event::poll(INPUT_POLL_TIMEOUT) {
            Ok(true) => match event::read() {
                Ok(ev) => {
                    if tx.blocking_send(InputMsg::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.blocking_send(InputMsg::Error(e.to_string()));
                    break;
                }
            },
            Ok(false) => {}
            Err(e) => {
                let _ = tx.blocking_send(InputMsg::Error(e.to_string()));
                break;
            }
        }
    }
}

/// What a key press asks the app to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AsyncCall,
    SyncClick,
    FanOut,
    CancelFanOut,
    AbortAsyncCall,
    Quit,
}

#[must_use]
pub fn action_for_key(key: KeyEvent) -> Option<Action> {
    if matches!(key.kind, KeyEventKind::Release) {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return (key.code == KeyCode::Char('c')).then_some(Action::Quit);
    }

    match key.code {
        KeyCode::Char('a') => Some(Action::AsyncCall),
        KeyCode::Char('s') => Some(Action::SyncClick),
        KeyCode::Char('f') => Some(Action::FanOut),
        KeyCode::Char('c') => Some(Action::CancelFanOut),
        KeyCode::Char('x') => Some(Action::AbortAsyncCall),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

pub fn apply_action(app: &mut App, services: &Services, action: Action) {
    debug!(?action, "Key action");
    match action {
        Action::AsyncCall => app.start_async_call(services),
        Action::SyncClick => app.click_sync(),
        Action::FanOut => app.start_fan_out(services),
        Action::CancelFanOut => app.cancel_fan_out(services),
        Action::AbortAsyncCall => app.abort_async_call(),
        Action::Quit => app.request_quit(),
    }
}

/// Drain pending terminal events without blocking. Returns whether the app should quit.
pub fn handle_events(app: &mut App, services: &Services, input: &mut InputPump) -> Result<bool> {
    let mut processed = 0;
    while processed < MAX_EVENTS_PER_FRAME {
        let ev = match input.rx.try_recv() {
            Ok(InputMsg::Event(ev)) => ev,
            Ok(InputMsg::Error(msg)) => return Err(anyhow!("input error: {msg}")),
            Err(mpsc::error::TryRecvError::Empty) => break,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                return Err(anyhow!("input pump disconnected"));
            }
        };

        if let Event::Key(key) = ev
            && let Some(action) = action_for_key(key)
        {
            apply_action(app, services, action);
            if app.should_quit() {
                return Ok(true);
            }
        }
        processed += 1;
    }
    Ok(app.should_quit())
}
