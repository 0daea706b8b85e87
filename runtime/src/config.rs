use serde::Deserialize;
use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

use crate::fanout::MAX_TASK_SET_SIZE;

pub const DEFAULT_URL: &str = "http://python.org";
pub const DEFAULT_FAN_OUT: usize = 10;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_SLEEP_UNIT: Duration = Duration::from_secs(1);
pub const DEFAULT_GATHER_WIDTH: usize = 5;
pub const DEFAULT_BODY_PREFIX_CHARS: usize = 15;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_TICK: Duration = Duration::from_millis(16);
pub const DEFAULT_WORKER_THREAD_NAME: &str = "tether-worker";

/// Environment override for `demo.url`.
pub const URL_ENV_VAR: &str = "TETHER_URL";

#[derive(Debug, Default, Deserialize)]
pub struct TetherConfig {
    pub app: Option<AppConfig>,
    pub runtime: Option<RuntimeConfig>,
    pub demo: Option<DemoConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// UI frame cadence in milliseconds.
    pub tick_ms: Option<u64>,
    /// Swap the Kanagawa palette for plain high-contrast colors.
    pub high_contrast: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RuntimeConfig {
    /// Name given to the worker thread that hosts the task runtime.
    pub thread_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DemoConfig {
    /// Fetched by both demos. Supports `${VAR}` expansion.
    pub url: Option<String>,
    /// Number of tasks launched by the fan-out demo.
    pub fan_out: Option<usize>,
    pub poll_interval_ms: Option<u64>,
    /// Length of one simulated delay unit.
    pub sleep_unit_ms: Option<u64>,
    /// Number of concurrent sleepers in the async-call demo.
    pub gather_width: Option<usize>,
    pub body_prefix_chars: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    /// Overall fan-in deadline. 0 or absent disables it.
    pub overall_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

/// Demo parameters after defaults, env expansion and clamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoSettings {
    pub url: String,
    pub fan_out: usize,
    pub poll_interval: Duration,
    pub sleep_unit: Duration,
    pub gather_width: usize,
    pub body_prefix_chars: usize,
    pub request_timeout: Duration,
    pub overall_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self::resolve(None, None)
    }
}

impl DemoSettings {
    /// Resolve settings from config plus the `TETHER_URL` environment override.
    #[must_use]
    pub fn from_config(config: Option<&TetherConfig>) -> Self {
        let url_override = env::var(URL_ENV_VAR).ok().filter(|v| !v.trim().is_empty());
        Self::resolve(config.and_then(|c| c.demo.as_ref()), url_override)
    }

    #[must_use]
    pub fn resolve(demo: Option<&DemoConfig>, url_override: Option<String>) -> Self {
        let empty = DemoConfig::default();
        let demo = demo.unwrap_or(&empty);

        let url = url_override
            .or_else(|| demo.url.as_deref().map(expand_env_vars))
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        let fan_out = demo.fan_out.unwrap_or(DEFAULT_FAN_OUT);
        if fan_out > MAX_TASK_SET_SIZE {
            tracing::warn!(
                fan_out,
                max = MAX_TASK_SET_SIZE,
                "demo.fan_out exceeds task set limit; clamping"
            );
        }

        let user_agent = demo
            .user_agent
            .as_deref()
            .map(expand_env_vars)
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(|| concat!("tether/", env!("CARGO_PKG_VERSION")).to_string());

        Self {
            url,
            fan_out: fan_out.min(MAX_TASK_SET_SIZE),
            poll_interval: demo
                .poll_interval_ms
                .filter(|ms| *ms > 0)
                .map_or(DEFAULT_POLL_INTERVAL, Duration::from_millis),
            sleep_unit: demo
                .sleep_unit_ms
                .map_or(DEFAULT_SLEEP_UNIT, Duration::from_millis),
            gather_width: demo.gather_width.unwrap_or(DEFAULT_GATHER_WIDTH),
            body_prefix_chars: demo.body_prefix_chars.unwrap_or(DEFAULT_BODY_PREFIX_CHARS),
            request_timeout: demo
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs),
            overall_timeout: demo
                .overall_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            user_agent,
        }
    }
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + end_rel];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + end_rel + 1..];
    }

    out.push_str(rest);
    out
}

impl TetherConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    /// Load from an explicit path. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.app
            .as_ref()
            .and_then(|app| app.tick_ms)
            .filter(|ms| *ms > 0)
            .map_or(DEFAULT_TICK, Duration::from_millis)
    }

    #[must_use]
    pub fn high_contrast(&self) -> bool {
        self.app
            .as_ref()
            .and_then(|app| app.high_contrast)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn worker_thread_name(&self) -> String {
        self.runtime
            .as_ref()
            .and_then(|rt| rt.thread_name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_WORKER_THREAD_NAME)
            .to_string()
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tether").join("config.toml"))
}
