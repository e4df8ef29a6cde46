//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Parameters for exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    pub initial_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    /// Jitter width as a percentage of the delay (10 = ±10%).
    pub jitter_percent: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            multiplier: 2.0,
            max_delay_ms: 5_000,
            jitter_percent: 10,
        }
    }
}

/// Calculate the pre-jitter delay for a 1-indexed attempt:
/// `min(initial * multiplier^(attempt-1), max)`.
pub fn calculate_backoff(attempt: u32, config: &BackoffConfig) -> u64 {
    if attempt == 0 {
        return 0;
    }

    let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
    let raw = config.initial_delay_ms as f64 * config.multiplier.powi(exponent);
    let capped = raw.min(config.max_delay_ms as f64);

    // NaN/inf from a pathological multiplier collapse to the ceiling.
    if capped.is_finite() {
        capped.round() as u64
    } else {
        config.max_delay_ms
    }
}

/// Add uniform jitter within ±`jitter_percent`% of `delay_ms`, never below 1ms.
pub fn add_jitter(delay_ms: u64, jitter_percent: u32) -> u64 {
    let spread = delay_ms as f64 * (jitter_percent as f64 / 100.0);
    let jitter = if spread > 0.0 {
        rand::thread_rng().gen_range(-spread..=spread)
    } else {
        0.0
    };

    let jittered = (delay_ms as f64 + jitter).round();
    if jittered < 1.0 {
        1
    } else {
        jittered as u64
    }
}

/// Delay to sleep before retrying after `attempt` failed.
pub fn jittered_backoff(attempt: u32, config: &BackoffConfig) -> Duration {
    let base = calculate_backoff(attempt, config);
    Duration::from_millis(add_jitter(base, config.jitter_percent))
}
