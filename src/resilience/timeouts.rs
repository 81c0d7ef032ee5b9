//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound each downstream attempt by a deadline
//! - Cancel the in-flight attempt cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the future cancels the call
//! - Timeout errors are distinct from other errors and map to 504

use std::future::Future;
use std::time::Duration;

use crate::config::TimeLimiterConfig;
use crate::error::GatewayError;

#[derive(Debug, Clone)]
pub struct TimeLimiter {
    name: String,
    timeout: Duration,
}

impl TimeLimiter {
    pub fn new(name: impl Into<String>, config: &TimeLimiterConfig) -> Self {
        Self {
            name: name.into(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn call<T, Fut>(&self, fut: Fut) -> Result<T, GatewayError>
    where
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(policy = %self.name, timeout = ?self.timeout, "Call timed out");
                Err(GatewayError::Timeout(self.timeout))
            }
        }
    }
}
