//! State worker configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Whether writes wait for the worker to acknowledge them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Every write carries a reply channel and waits for the stored value
    #[default]
    Ack,
    /// Writes are queued and return immediately; reads still reply
    FireAndForget,
}

/// State worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Acknowledged or fire-and-forget writes
    #[serde(default)]
    pub write_mode: WriteMode,

    /// Idle cycle in milliseconds; when set the worker polls instead of
    /// suspending on its channels
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,

    /// Channel buffer size for worker commands
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,

    /// Upper bound on how long a read or acknowledged write waits for a reply
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

fn default_channel_buffer() -> usize {
    debug!("default_channel_buffer: called");
    256
}

impl Default for StateConfig {
    fn default() -> Self {
        debug!("StateConfig::default: called");
        Self {
            write_mode: WriteMode::Ack,
            poll_interval_ms: None,
            channel_buffer: default_channel_buffer(),
            request_timeout_ms: None,
        }
    }
}

/// Milliseconds in `d`, rounded up and never below 1
fn whole_millis(d: Duration) -> u64 {
    let ms = d.as_nanos().div_ceil(1_000_000).max(1);
    u64::try_from(ms).unwrap_or(u64::MAX)
}

impl StateConfig {
    /// Get the idle poll cycle as a Duration, if polling is enabled
    pub fn poll_interval(&self) -> Option<Duration> {
        debug!(poll_interval_ms = ?self.poll_interval_ms, "StateConfig::poll_interval: called");
        self.poll_interval_ms.map(|ms| Duration::from_millis(ms.max(1)))
    }

    /// Get the request timeout as a Duration, if one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        debug!(request_timeout_ms = ?self.request_timeout_ms, "StateConfig::request_timeout: called");
        self.request_timeout_ms.map(|ms| Duration::from_millis(ms.max(1)))
    }

    /// Builder-style override for the write mode
    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// Builder-style override enabling poll mode
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = Some(whole_millis(interval));
        self
    }

    /// Builder-style override for the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(whole_millis(timeout));
        self
    }
}
