//! Client configuration and reconnect policy.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff between reconnect attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// `0` retries forever.
    pub max_attempts: u32,
    /// Random extra delay as a fraction of the computed delay, `0.0..=1.0`.
    pub jitter: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: 0,
            jitter: 0.2,
        }
    }
}

impl ReconnectPolicy {
    /// Whether reconnect attempt number `attempt` (1-based) may run.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts == 0 || attempt <= self.max_attempts
    }

    /// Delay before attempt `attempt` (1-based), without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Delay before attempt `attempt` with random jitter added.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let spread = self.jitter.clamp(0.0, 1.0);
        if spread == 0.0 || base.is_zero() {
            return base;
        }
        let extra = rand::rng().random_range(0.0..=spread);
        base + base.mul_f64(extra)
    }
}

/// Settings for [`super::ActivityClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Socket endpoint, e.g. `ws://localhost:5000/socket`
    pub url: String,
    pub reconnect: ReconnectPolicy,
    /// How often a `ping` frame is sent to keep the socket alive
    pub ping_interval: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectPolicy::default(),
            ping_interval: Duration::from_secs(20),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }
}
