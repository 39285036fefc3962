//! Backoff configuration for transient upload failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{deserialize_duration, serialize_duration};

/// Exponential backoff settings for retryable errors.
///
/// Permanent errors (authentication, local I/O) are never retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per upload, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles each attempt after that.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    #[serde(default = "default_base_delay")]
    pub base_delay: Duration,

    /// Cap on the computed delay.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    #[serde(default = "default_max_delay")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
        }
    }
}

fn default_max_attempts() -> u32 {
    6
}

fn default_base_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(120)
}

/// Delay to sleep before `attempt` (1-based; attempt 1 never sleeps).
pub fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    if attempt <= 1 {
        return Duration::ZERO;
    }
    let pow = attempt.saturating_sub(2).min(16);
    let delay = config.base_delay.saturating_mul(2_u32.saturating_pow(pow));
    delay.min(config.max_delay)
}
