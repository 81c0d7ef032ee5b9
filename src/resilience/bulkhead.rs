//! Concurrency limiting.
//!
//! Each bulkhead owns a semaphore sized to `max_concurrent_calls`. The permit
//! is held for the whole downstream call, including every retry attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::BulkheadConfig;
use crate::error::GatewayError;
use crate::observability::metrics;

#[derive(Debug)]
pub struct Bulkhead {
    name: String,
    max_wait: Duration,
    semaphore: Arc<Semaphore>,
}

impl Bulkhead {
    pub fn new(name: impl Into<String>, config: &BulkheadConfig) -> Self {
        Self {
            name: name.into(),
            max_wait: Duration::from_millis(config.max_queue_wait_ms),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_calls as usize)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Reserve a slot. The slot is released when the permit drops.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, GatewayError> {
        let permit = if self.max_wait.is_zero() {
            self.semaphore.clone().try_acquire_owned().ok()
        } else {
            tokio::time::timeout(self.max_wait, self.semaphore.clone().acquire_owned())
                .await
                .ok()
                .and_then(Result::ok)
        };

        permit.ok_or_else(|| {
            tracing::debug!(policy = %self.name, "Bulkhead full");
            metrics::record_policy_rejection(&self.name, "bulkhead");
            GatewayError::BulkheadFull(self.name.clone())
        })
    }

    pub async fn call<T, F, Fut>(&self, f: F) -> Result<T, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let _permit = self.acquire().await?;
        f().await
    }
}
