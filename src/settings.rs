use crate::dashboard::history::DEFAULT_UNDO_LIMIT;
use crate::feed::ReconnectPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Stats feed connection settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FeedSettings {
    /// Seconds between stats messages requested from the backend.
    #[serde(default = "default_feed_interval")]
    pub interval_secs: u32,
    /// Polling interval used while the socket is down.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_feed_interval(),
            poll_interval_secs: default_poll_interval(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl FeedSettings {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.max_retries,
            Duration::from_secs(self.poll_interval_secs.max(1)),
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Base URL of the appliance API, e.g. `http://cubeos.local/api`.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Enable debug logging. `RUST_LOG` is only honoured when this is set.
    #[serde(default)]
    pub debug_logging: bool,
    /// Also write logs to this file.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_undo_limit")]
    pub undo_limit: usize,
    #[serde(default)]
    pub feed: FeedSettings,
}

fn default_backend_url() -> String {
    "http://cubeos.local/api".into()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_undo_limit() -> usize {
    DEFAULT_UNDO_LIMIT
}

fn default_feed_interval() -> u32 {
    2
}

fn default_poll_interval() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    10
}

fn default_base_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout(),
            debug_logging: false,
            log_file: None,
            undo_limit: default_undo_limit(),
            feed: FeedSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing or empty file yields the defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        if self.request_timeout_secs == 0 {
            tracing::warn!("request_timeout_secs is 0; using the default");
            return Duration::from_secs(default_request_timeout());
        }
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        self.feed.reconnect_policy()
    }

    /// WebSocket URL of the stats feed for these settings.
    pub fn feed_url(&self) -> anyhow::Result<String> {
        crate::feed::feed_url(&self.backend_url, self.feed.interval_secs)
    }
}
