//! Delay strategies between retry attempts.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::config::{BackoffKind, RetryConfig};

/// Maps the number of the attempt that just failed (1-based) to the wait
/// before the next one.
pub type BackoffFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Same delay before every attempt.
pub fn fixed(wait: Duration) -> BackoffFn {
    Arc::new(move |_| wait)
}

/// Exponential delay with jitter, capped at `max_ms`.
pub fn exponential(base_ms: u64, max_ms: u64) -> BackoffFn {
    Arc::new(move |attempt| calculate_backoff(attempt, base_ms, max_ms))
}

pub fn from_config(config: &RetryConfig) -> BackoffFn {
    match config.backoff {
        BackoffKind::Fixed => fixed(Duration::from_millis(config.wait_duration_ms)),
        BackoffKind::Exponential => {
            exponential(config.wait_duration_ms, config.max_wait_duration_ms)
        }
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Jitter: 0 to 10% of the delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200);

        let max = calculate_backoff(10, 100, 1000);
        assert!(max.as_millis() >= 1000 && max.as_millis() < 1100);
    }

    #[test]
    fn test_fixed_ignores_attempt() {
        let backoff = fixed(Duration::from_millis(250));
        assert_eq!(backoff(1), Duration::from_millis(250));
        assert_eq!(backoff(7), Duration::from_millis(250));
    }

    #[test]
    fn test_from_config() {
        let config = RetryConfig {
            wait_duration_ms: 40,
            ..RetryConfig::default()
        };
        assert_eq!(from_config(&config)(3), Duration::from_millis(40));

        let config = RetryConfig {
            wait_duration_ms: 40,
            backoff: BackoffKind::Exponential,
            ..RetryConfig::default()
        };
        assert!(from_config(&config)(3) >= Duration::from_millis(160));
    }
}
