//! Config file on disk drives the demo settings end to end.

use std::fs;
use std::time::Duration;

use tempfile::tempdir;
use tether_runtime::{DemoSettings, TetherConfig};
use tether_tui::AsyncCall;

use crate::common::{Origin, Shell};

#[test]
fn settings_from_file_shape_the_async_call() {
    let origin = Origin::html(Duration::ZERO);
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        format!(
            r#"
[app]
tick_ms = 8

[demo]
url = "{}"
gather_width = 3
sleep_unit_ms = 1
body_prefix_chars = 9
request_timeout_secs = 5
"#,
            origin.uri()
        ),
    )
    .unwrap();

    let config = TetherConfig::load_from(&path).unwrap().unwrap();
    assert_eq!(config.tick_interval(), Duration::from_millis(8));
    let settings = DemoSettings::resolve(config.demo.as_ref(), None);
    assert_eq!(settings.body_prefix_chars, 9);

    let mut shell = Shell::start(settings);
    shell.app.start_async_call(&shell.services);
    assert!(shell.run_until(|app| matches!(app.async_call(), AsyncCall::Idle)));
    assert_eq!(
        shell.app.label(),
        "200 text/html; charset=utf-8 <!doctype"
    );
}

#[test]
fn broken_file_reports_path_and_binary_can_fall_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[demo\nurl = ").unwrap();

    let err = TetherConfig::load_from(&path).unwrap_err();
    assert_eq!(err.path(), &path);

    let fallback = TetherConfig::load_from(&path).unwrap_or(None);
    let settings = DemoSettings::resolve(fallback.as_ref().and_then(|c| c.demo.as_ref()), None);
    assert_eq!(settings, DemoSettings::resolve(None, None));
}
