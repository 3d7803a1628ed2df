use serde::{Deserialize, Serialize};

fn default_base_delay_s() -> f64 {
    0.5
}

fn default_max_delay_s() -> f64 {
    30.0
}

fn default_max_malformed_attempts() -> u32 {
    3
}

/// Retry schedule for failed fetches.
///
/// Transient failures (transport errors, 5xx) are retried forever with
/// exponential backoff. Malformed payloads are retried a bounded number of
/// times since a broken file on the server rarely fixes itself.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_base_delay_s")]
    pub base_delay_s: f64,
    #[serde(default = "default_max_delay_s")]
    pub max_delay_s: f64,
    #[serde(default = "default_max_malformed_attempts")]
    pub max_malformed_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_s: default_base_delay_s(),
            max_delay_s: default_max_delay_s(),
            max_malformed_attempts: default_max_malformed_attempts(),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after `failures` consecutive failures.
    pub fn delay_after(&self, failures: u32) -> f64 {
        if failures == 0 {
            return 0.0;
        }
        let exponent = (failures - 1).min(30) as i32;
        (self.base_delay_s * 2f64.powi(exponent)).min(self.max_delay_s)
    }

    pub fn malformed_exhausted(&self, malformed_failures: u32) -> bool {
        malformed_failures >= self.max_malformed_attempts
    }
}
