//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub kv: KvConfig,

    #[serde(default)]
    pub event: EventConfig,

    #[serde(default)]
    pub websocket: WebSocketConfig,

    #[serde(default)]
    pub invocation: InvocationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// KV namespace store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvConfig {
    /// Page size used by `list` when the caller gives none.
    #[serde(default = "default_list_limit")]
    pub default_list_limit: usize,

    /// Upper bound applied to caller supplied page sizes.
    #[serde(default = "default_max_list_limit")]
    pub max_list_limit: usize,

    /// Interval of the expired-entry sweep (0 disables it).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl KvConfig {
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            default_list_limit: default_list_limit(),
            max_list_limit: default_max_list_limit(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_list_limit() -> usize {
    100
}

fn default_max_list_limit() -> usize {
    1000
}

fn default_sweep_interval() -> u64 {
    30
}

/// Event bus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Payloads retained per topic for `pull` consumers.
    #[serde(default = "default_retention")]
    pub retention: usize,

    /// Undelivered payloads a push subscriber may accumulate before it is detached.
    #[serde(default = "default_subscriber_backlog")]
    pub subscriber_backlog: usize,

    /// Topics kept at once. Past this, the least recently used topic with no
    /// subscribers, cursors or waiters is evicted to make room.
    #[serde(default = "default_max_topics")]
    pub max_topics: usize,

    /// Pull cursors a single topic may hold.
    #[serde(default = "default_max_consumers_per_topic")]
    pub max_consumers_per_topic: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
            subscriber_backlog: default_subscriber_backlog(),
            max_topics: default_max_topics(),
            max_consumers_per_topic: default_max_consumers_per_topic(),
        }
    }
}

fn default_retention() -> usize {
    1024
}

fn default_subscriber_backlog() -> usize {
    256
}

fn default_max_topics() -> usize {
    10_000
}

fn default_max_consumers_per_topic() -> usize {
    1024
}

/// WebSocket configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    /// Keep-alive ping interval (0 disables pings).
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Time allowed for a keep-alive ping to flush.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_secs: u64,

    /// Largest frame a script may write.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl WebSocketConfig {
    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_secs > 0).then(|| Duration::from_secs(self.ping_interval_secs))
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval(),
            ping_timeout_secs: default_ping_timeout(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

fn default_ping_interval() -> u64 {
    15
}

fn default_ping_timeout() -> u64 {
    5
}

fn default_max_frame_bytes() -> usize {
    1024 * 1024
}

/// Invocation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationConfig {
    /// Upper bound on a plain HTTP invocation. WebSocket invocations are unbounded.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: Option<u64>,

    /// Commit id reported to scripts through `meta.commit`.
    #[serde(default = "default_commit")]
    pub commit: String,
}

impl InvocationConfig {
    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            commit: default_commit(),
        }
    }
}

fn default_http_timeout() -> Option<u64> {
    Some(60)
}

fn default_commit() -> String {
    "local".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
