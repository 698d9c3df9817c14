//! Process configuration.
//!
//! The engine needs very little: the base URL of the central server and two
//! durations. Everything else (metrics, sources, parameters) arrives from
//! the metrics listing endpoint every cycle.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default interval between collection cycles (60 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Default timeout for each outgoing request (10 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Server URL did not parse.
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    Validation(String),
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the central server's metrics and measurement endpoints.
    pub server_url: Url,
    /// Interval between collection cycles (default: 60s).
    pub poll_interval: Duration,
    /// Timeout applied to every outgoing request (default: 10s).
    pub request_timeout: Duration,
}

impl EngineConfig {
    /// Create a configuration for the given server base URL.
    pub fn new(server_url: &str) -> Result<Self, ConfigError> {
        let server_url = Url::parse(server_url.trim_end_matches('/'))?;
        if !matches!(server_url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "server url scheme must be http or https, got '{}'",
                server_url.scheme()
            )));
        }
        Ok(Self {
            server_url,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Set the interval between collection cycles.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// URL of the metrics listing endpoint.
    pub fn metrics_url(&self) -> Url {
        endpoint(&self.server_url, "metrics")
    }

    /// URL of the measurement submission endpoint.
    pub fn measurements_url(&self) -> Url {
        endpoint(&self.server_url, "measurements")
    }
}

fn endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .expect("server url is always a base");
        segments.pop_if_empty().push(path);
    }
    url
}

/// Parse a duration string such as `30s`, `5m`, or `1h30m`.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ConfigError::Validation(
            "duration string is empty".to_string(),
        ));
    }
    humantime::parse_duration(s)
        .map_err(|e| ConfigError::Validation(format!("invalid duration '{s}': {e}")))
}
