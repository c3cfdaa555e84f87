//! Configuration for the sync engine.

use crate::error::{SyncError, SyncResult};
use std::time::Duration;

/// Environment variable holding the API base URL.
pub const ENV_API_URL: &str = "CHATSYNC_API_URL";
/// Environment variable overriding the poll interval, in seconds.
pub const ENV_POLL_SECS: &str = "CHATSYNC_POLL_SECS";
/// Environment variable overriding the fetch cool-down, in seconds.
pub const ENV_COOLDOWN_SECS: &str = "CHATSYNC_COOLDOWN_SECS";
/// Environment variable overriding the request timeout, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "CHATSYNC_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://127.0.0.1:3001";

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the helpdesk API, without trailing slash.
    pub base_url: String,
    /// Interval between re-fetches of the selected chat.
    pub poll_interval: Duration,
    /// How long a chat id stays in the in-flight set after its fetch completes.
    pub fetch_cooldown: Duration,
    /// Request timeout applied by the HTTP client.
    pub request_timeout: Duration,
}

impl SyncConfig {
    /// Creates a new sync configuration.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_secs(10),
            fetch_cooldown: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Builds a configuration from `CHATSYNC_*` environment variables.
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(lookup(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.into()));
        if let Some(secs) = parse_secs(&lookup, ENV_POLL_SECS)? {
            config = config.with_poll_interval(secs);
        }
        if let Some(secs) = parse_secs(&lookup, ENV_COOLDOWN_SECS)? {
            config = config.with_fetch_cooldown(secs);
        }
        if let Some(secs) = parse_secs(&lookup, ENV_TIMEOUT_SECS)? {
            config = config.with_request_timeout(secs);
        }
        config.validate()?;
        Ok(config)
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the fetch cool-down.
    pub fn with_fetch_cooldown(mut self, cooldown: Duration) -> Self {
        self.fetch_cooldown = cooldown;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> SyncResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(SyncError::Config(format!(
                "base url must be http(s): {:?}",
                self.base_url
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(SyncError::Config("poll interval must be positive".into()));
        }
        Ok(())
    }

    /// Returns the full URL for an API path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> SyncResult<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| SyncError::Config(format!("{key} must be whole seconds, got {raw:?}")))
        })
        .transpose()
}
