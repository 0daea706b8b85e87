//! Rendering tests: draw the real app state into a vt100 screen and read it back.

mod common;

use std::time::Duration;

use ratatui::Terminal;
use tether_tui::{App, FanOutView, draw};

use common::{Origin, Shell, fast_settings};
use screen_backend::ScreenBackend;

const WIDTH: u16 = 100;
const HEIGHT: u16 = 20;

fn render(app: &App) -> Terminal<ScreenBackend> {
    let mut terminal = Terminal::new(ScreenBackend::new(WIDTH, HEIGHT)).unwrap();
    terminal.draw(|frame| draw(frame, app)).unwrap();
    terminal
}

#[test]
fn idle_screen_shows_key_hints_and_panels() {
    let app = App::default();
    let terminal = render(&app);
    let screen = terminal.backend();

    let header = screen.row(1);
    for hint in ["Tether", "a async call", "s sync", "f fan-out", "c cancel fan-out", "q quit"] {
        assert!(header.contains(hint), "missing {hint:?} in {header:?}");
    }
    assert!(screen.find_row("Result").is_some());
    assert!(screen.find_row("Press a, s or f to start").is_some());
    assert!(screen.find_row("idle").is_some());
    assert!(screen.find_row("Ready │ Count is: 0").is_some());
}

#[test]
fn sync_click_is_visible_on_next_frame() {
    let mut app = App::default();
    app.click_sync();
    app.click_sync();
    let terminal = render(&app);
    let screen = terminal.backend();

    let label_row = screen.find_row("Count is: 2").unwrap();
    assert!(label_row < screen.find_row("Fan-out").unwrap());
}

#[test]
fn long_labels_are_truncated_to_the_panel() {
    let origin = Origin::html(Duration::ZERO);
    let mut settings = fast_settings(origin.uri());
    settings.body_prefix_chars = 500;
    let mut shell = Shell::start(settings);

    shell.app.start_async_call(&shell.services);
    assert!(shell.run_until(|app| !app.is_busy()));
    assert!(shell.app.label().ends_with("</html>"));

    let mut terminal = Terminal::new(ScreenBackend::new(40, HEIGHT)).unwrap();
    terminal.draw(|frame| draw(frame, &shell.app)).unwrap();
    let screen = terminal.backend();
    let row = screen.row(screen.find_row("200 text/html").unwrap());
    assert!(row.contains("..."), "{row:?}");
    assert!(!row.contains("</html>"), "{row:?}");
}

#[test]
fn running_fan_out_shows_progress_then_cancellation() {
    let origin = Origin::html(Duration::from_secs(30));
    let mut shell = Shell::start(fast_settings(origin.uri()));

    shell.app.start_fan_out(&shell.services);
    let terminal = render(&shell.app);
    assert!(terminal.backend().find_row("0 done, 10 pending (running").is_some());
    assert!(terminal.backend().find_row("Fan-out in progress").is_some());

    shell.app.cancel_fan_out(&shell.services);
    let terminal = render(&shell.app);
    assert!(terminal.backend().find_row("(cancelling").is_some());
    assert!(terminal.backend().find_row("Cancelling fan-out").is_some());

    assert!(shell.run_until(|app| matches!(app.fan_out(), FanOutView::Finished { .. })));
    let terminal = render(&shell.app);
    let screen = terminal.backend();
    assert!(screen.find_row("0 completed, 10 cancelled, 0 failed in").is_some());
    assert!(
        screen
            .find_row("Finished 10 tasks: 0 completed, 10 cancelled, 0 failed")
            .is_some()
    );
}

#[test]
fn newest_notice_is_listed_first() {
    let mut shell = Shell::start(fast_settings("http://127.0.0.1:9/".to_string()));
    shell.app.abort_async_call();
    shell.app.cancel_fan_out(&shell.services);

    let terminal = render(&shell.app);
    let screen = terminal.backend();
    let newest = screen.find_row("Nothing to cancel").unwrap();
    let oldest = screen.find_row("No async call running").unwrap();
    assert!(newest < oldest);
}
