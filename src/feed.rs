use crate::dashboard::grid::GridLayout;
use anyhow::{anyhow, Context, Result};
use rand::{thread_rng, Rng};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Where a widget gets its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Pushed by the shared stats feed.
    Realtime,
    /// Fetched by the widget on its own refresh interval.
    Polling,
    /// Needs no backend data.
    Static,
}

const REALTIME_WIDGETS: &[&str] = &[
    "vitals",
    "network",
    "disk",
    "cpu_gauge",
    "memory_gauge",
    "disk_gauge",
    "temp_gauge",
    "network_throughput",
    "containers",
];

const STATIC_WIDGETS: &[&str] = &["clock", "search", "quick_actions"];

/// Classify a widget id. Ids the feed does not cover are polled.
pub fn data_source(id: &str) -> DataSource {
    if REALTIME_WIDGETS.contains(&id) {
        DataSource::Realtime
    } else if STATIC_WIDGETS.contains(&id) {
        DataSource::Static
    } else {
        DataSource::Polling
    }
}

/// Widgets of `layout` that must poll independently.
pub fn polled_widgets(layout: &GridLayout) -> Vec<&str> {
    layout
        .widget_ids()
        .filter(|id| data_source(id) == DataSource::Polling)
        .collect()
}

/// System metrics carried by a stats message, in percent (temperature in °C).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SystemStats {
    #[serde(default, deserialize_with = "lenient_percent")]
    pub cpu: Option<f64>,
    #[serde(default, deserialize_with = "lenient_percent")]
    pub memory: Option<f64>,
    #[serde(default, deserialize_with = "lenient_percent")]
    pub disk: Option<f64>,
    #[serde(default, deserialize_with = "lenient_temperature")]
    pub temperature: Option<f64>,
}

/// One message from the real-time feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatsMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub system: SystemStats,
    #[serde(default)]
    pub network: Value,
    #[serde(default)]
    pub docker: Value,
}

impl StatsMessage {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("malformed feed message")
    }

    pub fn is_stats(&self) -> bool {
        self.kind == "stats"
    }
}

fn number_or_field(value: &Value, fields: &[&str]) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Object(map) => fields
            .iter()
            .find_map(|f| map.get(*f).and_then(Value::as_f64)),
        _ => None,
    }
}

fn lenient_percent<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(number_or_field(&value, &["percent", "usage_percent", "usage"]))
}

fn lenient_temperature<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(number_or_field(&value, &["celsius", "current", "value"]))
}

type StatsCallback = Box<dyn FnMut(&StatsMessage)>;

/// Fan-out of feed messages to subscribers registered under a stable key.
///
/// Subscribing twice with the same key replaces the earlier callback, so a
/// view that re-registers on every mount never receives duplicates.
#[derive(Default)]
pub struct FeedSubscriptions {
    subscribers: BTreeMap<String, StatsCallback>,
}

impl FeedSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, key: impl Into<String>, callback: impl FnMut(&StatsMessage) + 'static) {
        self.subscribers.insert(key.into(), Box::new(callback));
    }

    pub fn unsubscribe(&mut self, key: &str) -> bool {
        self.subscribers.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver `msg` to every subscriber. Returns how many were called.
    pub fn dispatch(&mut self, msg: &StatsMessage) -> usize {
        for callback in self.subscribers.values_mut() {
            callback(msg);
        }
        self.subscribers.len()
    }

    /// Parse a raw frame and dispatch it. Frames of other types are ignored.
    pub fn dispatch_text(&mut self, text: &str) -> Result<usize> {
        let msg = StatsMessage::parse(text)?;
        if !msg.is_stats() {
            tracing::debug!(kind = %msg.kind, "ignoring feed message");
            return Ok(0);
        }
        Ok(self.dispatch(&msg))
    }
}

/// Events that warrant reconnecting right away instead of waiting out a delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectTrigger {
    VisibilityRestored,
    NetworkOnline,
}

/// Reconnect schedule for the stats feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
    pub poll_interval: Duration,
    attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(1),
            Duration::from_secs(30),
            10,
            Duration::from_secs(5),
        )
    }
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, max_retries: u32, poll_interval: Duration) -> Self {
        Self {
            base_delay,
            max_delay: max_delay.max(base_delay),
            max_retries,
            poll_interval,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_retries
    }

    /// Delay before the next attempt, or `None` once the retry budget is spent.
    ///
    /// The exponential delay is capped first and then jittered into its upper
    /// half, so the result never exceeds `max_delay`.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.exhausted() {
            return None;
        }
        let factor = 2u32.saturating_pow(self.attempts.min(16));
        let capped = self.base_delay.saturating_mul(factor).min(self.max_delay);
        self.attempts += 1;
        let jitter: f64 = thread_rng().gen_range(0.5..=1.0);
        Some(capped.mul_f64(jitter))
    }

    /// Forget earlier failures. Called once a connection opens.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Restart the schedule after a trigger; the caller reconnects at once.
    pub fn trigger(&mut self, trigger: ReconnectTrigger) {
        tracing::debug!(?trigger, attempts = self.attempts, "feed reconnect triggered");
        self.reset();
    }
}

/// What the feed owner should do after a connection event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedAction {
    /// Open a new connection after the delay.
    Reconnect(Duration),
    /// Stay disconnected and poll on this interval.
    Poll(Duration),
    Nothing,
}

/// Connection state of the shared stats feed. Polling is active whenever the
/// socket is not connected.
#[derive(Debug, Clone, Default)]
pub struct FeedConnection {
    policy: ReconnectPolicy,
    connected: bool,
}

impl FeedConnection {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn should_poll(&self) -> bool {
        !self.connected
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    pub fn on_open(&mut self) {
        self.connected = true;
        self.policy.reset();
        tracing::info!("stats feed connected");
    }

    pub fn on_close(&mut self) -> FeedAction {
        self.connected = false;
        match self.policy.next_delay() {
            Some(delay) => {
                tracing::warn!(attempt = self.policy.attempts(), ?delay, "stats feed closed; reconnecting");
                FeedAction::Reconnect(delay)
            }
            None => {
                tracing::warn!("stats feed retries exhausted; polling");
                FeedAction::Poll(self.policy.poll_interval)
            }
        }
    }

    pub fn on_trigger(&mut self, trigger: ReconnectTrigger) -> FeedAction {
        if self.connected {
            return FeedAction::Nothing;
        }
        self.policy.trigger(trigger);
        FeedAction::Reconnect(Duration::ZERO)
    }
}

/// WebSocket URL of the stats feed below the API base URL.
pub fn feed_url(base: &str, interval_secs: u32) -> Result<String> {
    let mut url = Url::parse(base).with_context(|| format!("invalid backend url {base}"))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(anyhow!("unsupported scheme {other}")),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow!("cannot use {scheme} for {base}"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("{base} cannot be a base url"))?
        .pop_if_empty()
        .push("ws")
        .push("stats");
    url.query_pairs_mut()
        .clear()
        .append_pair("interval", &interval_secs.max(1).to_string());
    Ok(url.into())
}
