//! Realtime subscription configuration.

use serde::{Deserialize, Serialize};

/// Realtime (push channel) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Whether the console runner should open a realtime subscription.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// First reconnect delay in milliseconds.
    #[serde(default = "default_reconnect_initial")]
    pub reconnect_initial_ms: u64,
    /// Upper bound for the reconnect delay in milliseconds.
    #[serde(default = "default_reconnect_max")]
    pub reconnect_max_ms: u64,
    /// Growth factor applied to the delay after every failed attempt.
    #[serde(default = "default_multiplier")]
    pub reconnect_multiplier: f64,
    /// Fraction of the delay randomized as jitter (0.0 - 1.0).
    #[serde(default = "default_jitter")]
    pub reconnect_jitter: f64,
    /// Heartbeat interval for the websocket transport in seconds.
    #[serde(default = "default_heartbeat")]
    pub heartbeat_interval_seconds: u64,
    /// Buffer size for inbound frames and alert fan-out.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reconnect_initial_ms: default_reconnect_initial(),
            reconnect_max_ms: default_reconnect_max(),
            reconnect_multiplier: default_multiplier(),
            reconnect_jitter: default_jitter(),
            heartbeat_interval_seconds: default_heartbeat(),
            channel_buffer_size: default_channel_buffer(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_reconnect_initial() -> u64 {
    500
}

fn default_reconnect_max() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> f64 {
    0.2
}

fn default_heartbeat() -> u64 {
    30
}

fn default_channel_buffer() -> usize {
    256
}
