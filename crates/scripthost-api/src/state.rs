//! Application state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use scripthost_config::Config;
use scripthost_runtime::InvocationCoordinator;
use scripthost_websocket::ChannelOptions;

use crate::registry::ScriptRegistry;

/// Largest request body handed to a script.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across handlers.
pub struct AppState {
    pub coordinator: InvocationCoordinator,
    pub registry: Arc<ScriptRegistry>,
    /// Reported to scripts as `meta.commit`.
    pub commit: String,
    /// Deadline of plain HTTP invocations.
    pub http_timeout: Option<Duration>,
    pub channel_options: ChannelOptions,
    start_time: Instant,
    request_count: AtomicU64,
}

impl AppState {
    pub fn new(coordinator: InvocationCoordinator, registry: Arc<ScriptRegistry>, config: &Config) -> Self {
        Self {
            coordinator,
            registry,
            commit: config.invocation.commit.clone(),
            http_timeout: config.invocation.http_timeout(),
            channel_options: ChannelOptions::from(&config.websocket),
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn increment_requests(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }
}
