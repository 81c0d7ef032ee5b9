//! Fixed-window rate limiting.
//!
//! # Responsibilities
//! - Admit at most `limit_for_period` calls per refresh period
//! - Let callers wait up to `admission_timeout` for the next period
//!
//! # Design Decisions
//! - Windows are aligned to the limiter's creation instant, not to requests
//! - A caller whose deadline falls before the next refresh is rejected at
//!   once rather than sleeping only to fail

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RateLimiterConfig;
use crate::error::GatewayError;
use crate::observability::metrics;

#[derive(Debug)]
struct Window {
    started: Instant,
    available: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    limit_for_period: u32,
    refresh_period: Duration,
    admission_timeout: Duration,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, config: &RateLimiterConfig) -> Self {
        Self {
            name: name.into(),
            limit_for_period: config.limit_for_period,
            refresh_period: Duration::from_millis(config.limit_refresh_period_ms.max(1)),
            admission_timeout: Duration::from_millis(config.admission_timeout_ms),
            window: Mutex::new(Window {
                started: Instant::now(),
                available: config.limit_for_period,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Permits left in the current window.
    pub fn available_permits(&self) -> u32 {
        let mut window = self.lock();
        self.refresh(&mut window, Instant::now());
        window.available
    }

    /// Take one permit, waiting for a later window if allowed.
    pub async fn acquire(&self) -> Result<(), GatewayError> {
        let deadline = Instant::now() + self.admission_timeout;
        loop {
            let next_refresh = {
                let mut window = self.lock();
                self.refresh(&mut window, Instant::now());
                if window.available > 0 {
                    window.available -= 1;
                    return Ok(());
                }
                window.started + self.refresh_period
            };

            if next_refresh > deadline {
                tracing::debug!(policy = %self.name, "Rate limit exceeded");
                metrics::record_policy_rejection(&self.name, "rate_limiter");
                return Err(GatewayError::RateLimitExceeded(self.name.clone()));
            }
            tokio::time::sleep_until(next_refresh).await;
        }
    }

    pub async fn call<T, F, Fut>(&self, f: F) -> Result<T, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        self.acquire().await?;
        f().await
    }

    fn refresh(&self, window: &mut Window, now: Instant) {
        let elapsed = now.saturating_duration_since(window.started);
        if elapsed < self.refresh_period {
            return;
        }
        let periods = (elapsed.as_nanos() / self.refresh_period.as_nanos()) as u32;
        window.started += self.refresh_period * periods;
        window.available = self.limit_for_period;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Window> {
        self.window.lock().expect("rate limiter mutex poisoned")
    }
}
