//! Shared test utilities and fixtures
//!
//! A live worker thread, a UI queue drained on the test thread, and a mock HTTP origin.

#![allow(dead_code)]

use std::thread;
use std::time::{Duration, Instant};

use tether_runtime::ui_queue::{UiQueue, channel};
use tether_runtime::{Bridge, DemoSettings, MAX_CALLBACKS_PER_FRAME, Worker, build_client};
use tether_tui::{App, Services};
use tokio::runtime::Runtime;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const HTML_BODY: &str = "<!doctype html><html><head><title>demo</title></head></html>";

/// Mock origin plus the runtime that hosts it. Keep both alive for the whole test.
pub struct Origin {
    pub server: MockServer,
    _rt: Runtime,
}

impl Origin {
    pub fn html(delay: Duration) -> Self {
        let rt = Runtime::new().expect("test runtime");
        let server = rt.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(HTML_BODY)
                        .insert_header("content-type", "text/html; charset=utf-8")
                        .set_delay(delay),
                )
                .mount(&server)
                .await;
            server
        });
        Self { server, _rt: rt }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }
}

/// Fast settings: millisecond time units so the demos finish in well under a second.
pub fn fast_settings(url: String) -> DemoSettings {
    DemoSettings {
        url,
        fan_out: 10,
        poll_interval: Duration::from_millis(20),
        sleep_unit: Duration::from_millis(2),
        gather_width: 5,
        request_timeout: Duration::from_secs(5),
        ..DemoSettings::default()
    }
}

/// The binary's wiring, minus the terminal.
pub struct Shell {
    worker: Option<Worker>,
    pub queue: UiQueue<App>,
    pub services: Services,
    pub app: App,
}

impl Shell {
    pub fn start(settings: DemoSettings) -> Self {
        let worker = Worker::start("tether-it").expect("worker starts");
        let (tx, queue) = channel::<App>();
        let client = build_client(&settings).expect("client builds");
        let services = Services::new(Bridge::new(worker.handle().clone(), tx), client, settings);
        Self {
            worker: Some(worker),
            queue,
            services,
            app: App::default(),
        }
    }

    /// One frame's worth of callbacks.
    pub fn frame(&mut self) -> usize {
        self.app.tick();
        self.queue.drain(&mut self.app, MAX_CALLBACKS_PER_FRAME)
    }

    /// Run frames until `done` holds or ten seconds pass.
    pub fn run_until(&mut self, done: impl Fn(&App) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            self.frame();
            if done(&self.app) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.shutdown();
    }
}
