//! Workloads behind the UI actions.

use std::time::Duration;

use futures_util::future::join_all;
use reqwest::Client;
use tokio::time::sleep;

use tether_types::TaskOutcome;

use crate::config::DemoSettings;
use crate::fanout::{LaunchError, TaskSet, launch};
use crate::fetch::{FetchSummary, fetch_summary};
use crate::worker::RuntimeHandle;

/// Run `width` sleepers concurrently. Sleeper `i` sleeps `i` times for `i` units each,
/// so the whole gather takes `(width - 1)^2` units.
pub async fn staggered_sleepers(width: usize, unit: Duration) {
    join_all((0..width).map(|i| async move {
        let step = unit * i as u32;
        for tick in 0..i {
            tracing::trace!(sleeper = i, tick, "Sleeping");
            sleep(step).await;
        }
    }))
    .await;
}

/// The "async call" action: concurrent sleepers, then a single fetch.
pub async fn sleep_then_fetch(client: Client, settings: DemoSettings) -> TaskOutcome<String> {
    staggered_sleepers(settings.gather_width, settings.sleep_unit).await;
    tracing::debug!("Sleepers finished");

    let summary = fetch_summary(&client, &settings.url, settings.body_prefix_chars).await?;
    Ok(summary.to_string())
}

/// Start delay for fan-out task `index`: distinct half-unit steps.
#[must_use]
pub fn fan_out_delay(index: usize, unit: Duration) -> Duration {
    unit * (index as u32 + 1) / 2
}

/// The "fan-out" action: `settings.fan_out` staggered fetches of the same URL.
pub fn launch_fetch_fan_out(
    runtime: &RuntimeHandle,
    client: &Client,
    settings: &DemoSettings,
) -> Result<TaskSet<FetchSummary>, LaunchError> {
    let unit = settings.sleep_unit;
    let prefix_chars = settings.body_prefix_chars;

    launch(runtime, settings.fan_out, |index, ctx| {
        let client = client.clone();
        let url = settings.url.clone();
        async move {
            sleep(fan_out_delay(index, unit)).await;
            tracing::debug!(task = %ctx.id(), index, "Fetching");
            fetch_summary(&client, &url, prefix_chars).await
        }
    })
}
