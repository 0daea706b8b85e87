//! End-to-end demo flows: key actions on the UI thread, work on the worker, results
//! back through the UI queue.

use std::thread;
use std::time::{Duration, Instant};

use tether_tui::{AsyncCall, FanOutView, NoticeKind};

use crate::common::{Origin, Shell, fast_settings};

fn finished(app: &tether_tui::App) -> bool {
    matches!(app.fan_out(), FanOutView::Finished { .. })
}

#[test]
fn async_call_lands_fetch_summary_in_label() {
    let origin = Origin::html(Duration::ZERO);
    let mut shell = Shell::start(fast_settings(origin.uri()));

    shell.app.start_async_call(&shell.services);
    assert!(matches!(shell.app.async_call(), AsyncCall::Running { .. }));

    assert!(shell.run_until(|app| matches!(app.async_call(), AsyncCall::Idle)));
    assert_eq!(
        shell.app.label(),
        "200 text/html; charset=utf-8 <!doctype html>"
    );
}

#[test]
fn sync_clicks_are_handled_while_async_call_is_in_flight() {
    let origin = Origin::html(Duration::from_millis(300));
    let mut shell = Shell::start(fast_settings(origin.uri()));

    let started = Instant::now();
    shell.app.start_async_call(&shell.services);
    for _ in 0..3 {
        shell.app.click_sync();
        shell.frame();
    }
    assert!(started.elapsed() < Duration::from_millis(300));
    assert_eq!(shell.app.label(), "Count is: 3");
    assert!(shell.app.is_busy());

    assert!(shell.run_until(|app| !app.is_busy()));
    assert!(shell.app.label().starts_with("200 "));
    assert_eq!(shell.app.count(), 3);
}

#[test]
fn fan_out_progress_is_monotonic_and_summary_counts_all() {
    let origin = Origin::html(Duration::from_millis(10));
    let mut shell = Shell::start(fast_settings(origin.uri()));

    shell.app.start_fan_out(&shell.services);
    let mut seen = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(10);
    while !finished(&shell.app) && Instant::now() < deadline {
        shell.frame();
        if let FanOutView::Running { progress, .. } = shell.app.fan_out() {
            assert_eq!(progress.total(), 10);
            seen.push(progress.done());
        }
        thread::sleep(Duration::from_millis(2));
    }

    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    let FanOutView::Finished { summary, .. } = shell.app.fan_out() else {
        panic!("fan-out did not finish: {:?}", shell.app.fan_out());
    };
    assert_eq!(summary.completed, 10);
    assert_eq!(summary.cancelled + summary.failed, 0);
    assert_eq!(
        shell.app.label(),
        "Finished 10 tasks: 10 completed, 0 cancelled, 0 failed"
    );
    assert_eq!(
        shell.app.notices().last().map(|n| n.kind),
        Some(NoticeKind::Success)
    );
}

#[test]
fn cancel_stops_every_in_flight_fetch() {
    let origin = Origin::html(Duration::from_secs(30));
    let mut shell = Shell::start(fast_settings(origin.uri()));

    shell.app.start_fan_out(&shell.services);
    thread::sleep(Duration::from_millis(100));
    shell.frame();
    shell.app.cancel_fan_out(&shell.services);

    assert!(shell.run_until(|app| {
        finished(app) && app.notices().any(|n| n.text.starts_with("Cancelled "))
    }));
    let FanOutView::Finished { summary, .. } = shell.app.fan_out() else {
        unreachable!();
    };
    assert_eq!(summary.cancelled, 10);
    assert!(
        shell
            .app
            .notices()
            .any(|n| n.text == "Cancelled 10 tasks (0 had already finished)")
    );

    // A second cancel after the set resolved does nothing.
    shell.app.cancel_fan_out(&shell.services);
    assert_eq!(
        shell.app.notices().last().map(|n| n.text.as_str()),
        Some("Nothing to cancel")
    );
}

#[test]
fn fan_in_deadline_cancels_stragglers() {
    let origin = Origin::html(Duration::from_secs(30));
    let mut settings = fast_settings(origin.uri());
    settings.overall_timeout = Some(Duration::from_millis(200));
    let mut shell = Shell::start(settings);

    shell.app.start_fan_out(&shell.services);
    assert!(shell.run_until(finished));

    let FanOutView::Finished { summary, .. } = shell.app.fan_out() else {
        unreachable!();
    };
    assert_eq!(summary.cancelled, 10);
    assert_eq!(
        shell.app.notices().last().map(|n| n.kind),
        Some(NoticeKind::Warning)
    );
}

#[test]
fn shutdown_with_work_outstanding_is_clean() {
    let origin = Origin::html(Duration::from_secs(30));
    let mut shell = Shell::start(fast_settings(origin.uri()));

    shell.app.start_async_call(&shell.services);
    shell.app.start_fan_out(&shell.services);
    shell.app.cancel_outstanding();

    let started = Instant::now();
    shell.shutdown();
    assert!(started.elapsed() < Duration::from_secs(5));

    // Every outstanding submission still reports back.
    assert!(shell.run_until(|app| !app.is_busy()));
}
