//! Retry logic.
//!
//! # Responsibilities
//! - Re-run a failed call up to `max_attempts` total attempts
//! - Classify failures through a pluggable predicate
//! - Wait between attempts through a pluggable backoff function
//!
//! # Design Decisions
//! - A success on any attempt ends the loop
//! - Non-retryable failures surface immediately, unwrapped
//! - Exhaustion surfaces `RetryExhausted` carrying the last failure

use std::future::Future;
use std::sync::Arc;

use crate::config::RetryConfig;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::resilience::backoff::{self, BackoffFn};

/// Decides whether a failure deserves another attempt.
pub type RetryPredicate = Arc<dyn Fn(&GatewayError) -> bool + Send + Sync>;

/// Retry policy.
pub struct Retry {
    name: String,
    max_attempts: u32,
    backoff: BackoffFn,
    retryable: RetryPredicate,
}

impl std::fmt::Debug for Retry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retry")
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl Retry {
    pub fn new(
        name: impl Into<String>,
        max_attempts: u32,
        backoff: BackoffFn,
        retryable: RetryPredicate,
    ) -> Self {
        Self {
            name: name.into(),
            max_attempts: max_attempts.max(1),
            backoff,
            retryable,
        }
    }

    /// Build from configuration; failures whose kind is listed in
    /// `retry_on` are retried.
    pub fn from_config(name: &str, config: &RetryConfig) -> Self {
        let kinds = config.retry_on.clone();
        Self::new(
            name,
            config.max_attempts,
            backoff::from_config(config),
            Arc::new(move |err: &GatewayError| kinds.contains(&err.root().kind())),
        )
    }

    pub fn with_backoff(mut self, backoff: BackoffFn) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_predicate(mut self, retryable: RetryPredicate) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `f` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. `f` receives the 1-based attempt number.
    pub async fn call<T, F, Fut>(&self, mut f: F) -> Result<T, GatewayError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 1;
        loop {
            match f(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(policy = %self.name, attempt, "Call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if !(self.retryable)(&err) => {
                    tracing::debug!(policy = %self.name, attempt, error = %err, "Failure is not retryable");
                    return Err(err);
                }
                Err(err) if attempt >= self.max_attempts => {
                    tracing::warn!(policy = %self.name, attempts = attempt, error = %err, "Retries exhausted");
                    return Err(GatewayError::RetryExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    let delay = (self.backoff)(attempt);
                    tracing::info!(policy = %self.name, attempt, delay = ?delay, error = %err, "Retrying call");
                    metrics::record_retry(&self.name);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
