//! Minimal HTTP GET used by the demos.

use std::fmt;

use reqwest::{Client, header::CONTENT_TYPE};

use tether_types::{TaskError, TaskOutcome};

use crate::config::DemoSettings;

/// Status line, content type and the first few characters of a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub status: u16,
    pub content_type: String,
    pub prefix: String,
}

impl fmt::Display for FetchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.status, self.content_type, self.prefix.trim_end())
    }
}

/// Build the shared client. The request timeout bounds every fetch; a stalled server ends
/// as a transport error.
pub fn build_client(settings: &DemoSettings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.request_timeout)
        .build()
}

/// GET `url` and keep at most `prefix_chars` characters of the body.
///
/// Any status code is a successful fetch; only transport failures are errors.
pub async fn fetch_summary(
    client: &Client,
    url: &str,
    prefix_chars: usize,
) -> TaskOutcome<FetchSummary> {
    let response = client.get(url).send().await.map_err(transport_error)?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response.text().await.map_err(transport_error)?;
    let prefix: String = body.chars().take(prefix_chars).collect();

    tracing::debug!(url, status, "Fetch finished");
    Ok(FetchSummary {
        status,
        content_type,
        prefix,
    })
}

fn transport_error(err: reqwest::Error) -> TaskError {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connect failed"
    } else {
        "request failed"
    };
    TaskError::Transport(format!("{kind}: {err}"))
}
