//! Policy composition.
//!
//! Turns the policy names bound to a route into one [`PolicyStack`] and runs
//! downstream calls through it:
//!
//! ```text
//! Bulkhead → RateLimiter → Retry ┬→ CircuitBreaker → TimeLimiter → call
//!                                └─ re-entered for every attempt
//! ```
//!
//! Admission controls run once per request and hold their slot across
//! retries. The breaker records every attempt separately and the time limit
//! bounds each attempt, not the retry loop.

use std::future::Future;

use crate::config::PolicyTables;
use crate::error::GatewayError;
use crate::resilience::{Bulkhead, CircuitBreaker, RateLimiter, Retry, TimeLimiter};

/// Binding problems detected while building a stack.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("unknown policy '{0}'")]
    UnknownPolicy(String),

    #[error("policies '{first}' and '{second}' both define a {kind}")]
    Conflict {
        kind: &'static str,
        first: String,
        second: String,
    },
}

/// The primitives bound to one route. Each instance is private to the route.
#[derive(Debug, Default)]
pub struct PolicyStack {
    pub bulkhead: Option<Bulkhead>,
    pub rate_limiter: Option<RateLimiter>,
    pub retry: Option<Retry>,
    pub circuit_breaker: Option<CircuitBreaker>,
    pub time_limiter: Option<TimeLimiter>,
}

impl PolicyStack {
    /// Instantiate the named policies for one route. Instance names are
    /// `<scope>/<policy>` so logs and metrics tell routes apart.
    pub fn build(
        scope: &str,
        names: &[String],
        tables: &PolicyTables,
    ) -> Result<Self, BindingError> {
        check_bindings(names, tables)?;

        let mut stack = PolicyStack::default();
        for name in names {
            let instance = format!("{}/{}", scope, name);
            if let Some(cfg) = tables.bulkhead.get(name) {
                stack.bulkhead = Some(Bulkhead::new(&instance, cfg));
            }
            if let Some(cfg) = tables.rate_limiter.get(name) {
                stack.rate_limiter = Some(RateLimiter::new(&instance, cfg));
            }
            if let Some(cfg) = tables.retry.get(name) {
                stack.retry = Some(Retry::from_config(&instance, cfg));
            }
            if let Some(cfg) = tables.circuit_breaker.get(name) {
                stack.circuit_breaker = Some(CircuitBreaker::new(&instance, cfg));
            }
            if let Some(cfg) = tables.time_limiter.get(name) {
                stack.time_limiter = Some(TimeLimiter::new(&instance, cfg));
            }
        }
        Ok(stack)
    }

    pub fn is_empty(&self) -> bool {
        self.bulkhead.is_none()
            && self.rate_limiter.is_none()
            && self.retry.is_none()
            && self.circuit_breaker.is_none()
            && self.time_limiter.is_none()
    }

    /// Run `call` through every bound primitive. `call` is invoked once per
    /// attempt.
    pub async fn execute<T, F, Fut>(&self, call: F) -> Result<T, GatewayError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let _slot = match &self.bulkhead {
            Some(bulkhead) => Some(bulkhead.acquire().await?),
            None => None,
        };
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await?;
        }

        match &self.retry {
            Some(retry) => retry.call(|_| self.attempt(&call)).await,
            None => self.attempt(&call).await,
        }
    }

    async fn attempt<T, F, Fut>(&self, call: &F) -> Result<T, GatewayError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let bounded = async {
            match &self.time_limiter {
                Some(limiter) => limiter.call(call()).await,
                None => call().await,
            }
        };
        match &self.circuit_breaker {
            Some(breaker) => breaker.call(|| bounded).await,
            None => bounded.await,
        }
    }
}

/// Every name must exist and no two names may define the same primitive.
pub fn check_bindings(names: &[String], tables: &PolicyTables) -> Result<(), BindingError> {
    let mut claimed: Vec<(&'static str, &str)> = Vec::new();
    for name in names {
        let kinds = tables.kinds(name);
        if kinds.is_empty() {
            return Err(BindingError::UnknownPolicy(name.clone()));
        }
        for kind in kinds {
            if let Some((_, first)) = claimed.iter().find(|(k, _)| *k == kind) {
                return Err(BindingError::Conflict {
                    kind,
                    first: first.to_string(),
                    second: name.clone(),
                });
            }
            claimed.push((kind, name));
        }
    }
    Ok(())
}
