//! Exponential reconnect backoff with jitter.

use std::time::Duration;

use rand::Rng;

use brokerdesk_core::config::RealtimeConfig;

/// Reconnect delay schedule.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial_ms: f64,
    max_ms: f64,
    multiplier: f64,
    jitter: f64,
    attempt: u32,
}

impl Backoff {
    /// Build a schedule from configuration.
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            initial_ms: config.reconnect_initial_ms.max(1) as f64,
            max_ms: config.reconnect_max_ms.max(config.reconnect_initial_ms.max(1)) as f64,
            multiplier: config.reconnect_multiplier.max(1.0),
            jitter: config.reconnect_jitter.clamp(0.0, 1.0),
            attempt: 0,
        }
    }

    /// Delay before the next attempt; each call grows the base delay.
    pub fn next_delay(&mut self) -> Duration {
        let base = (self.initial_ms * self.multiplier.powi(self.attempt as i32)).min(self.max_ms);
        self.attempt = self.attempt.saturating_add(1);

        let factor = if self.jitter > 0.0 {
            1.0 + rand::rng().random_range(-self.jitter..=self.jitter)
        } else {
            1.0
        };
        Duration::from_millis((base * factor).max(0.0) as u64)
    }

    /// Start over after a healthy connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Failed attempts since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
