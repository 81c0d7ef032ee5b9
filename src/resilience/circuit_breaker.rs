//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, outcomes recorded in a count-based sliding window
//! - Open: backend assumed down, calls fail fast with `CircuitOpen`
//! - Half-Open: a bounded family of probe calls decides between Closed and Open
//!
//! # State Transitions
//! ```text
//! Closed → Open: window full and failure rate >= threshold
//! Open → Half-Open: first call after wait_duration_in_open_state
//! Half-Open → Closed: all permitted probes done, failure rate < threshold
//! Half-Open → Open: all permitted probes done, failure rate >= threshold
//! ```
//!
//! # Design Decisions
//! - Per route, per policy name (not global)
//! - Every transition bumps a generation; outcomes of calls admitted under an
//!   older generation are discarded so late results cannot double-count
//! - A permit dropped without an outcome (cancelled call) frees its
//!   half-open slot instead of counting as success or failure

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::error::GatewayError;
use crate::observability::metrics;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    fn gauge(&self) -> u8 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    /// Recent outcomes while closed; `true` = failure.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    generation: u64,
    half_open_issued: u32,
    half_open_completed: u32,
    half_open_failures: u32,
}

/// Count-based circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_rate_threshold: f64,
    sliding_window_size: usize,
    wait_in_open: Duration,
    permitted_in_half_open: u32,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: &CircuitBreakerConfig) -> Self {
        let sliding_window_size = config.sliding_window_size.max(1) as usize;
        Self {
            name: name.into(),
            failure_rate_threshold: config.failure_rate_threshold,
            sliding_window_size,
            wait_in_open: Duration::from_millis(config.wait_duration_in_open_state_ms),
            permitted_in_half_open: config.permitted_calls_in_half_open_state.max(1),
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                window: VecDeque::with_capacity(sliding_window_size),
                opened_at: None,
                generation: 0,
                half_open_issued: 0,
                half_open_completed: 0,
                half_open_failures: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state. An open circuit whose wait has elapsed still reports
    /// `Open` until the next call moves it to `HalfOpen`.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Failure rate of the closed-state window, once the window is full.
    pub fn failure_rate(&self) -> Option<f64> {
        let inner = self.lock();
        if inner.window.len() < self.sliding_window_size {
            return None;
        }
        Some(Self::rate(
            inner.window.iter().filter(|failed| **failed).count(),
            inner.window.len(),
        ))
    }

    /// Ask for permission to run one call.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, GatewayError> {
        let mut inner = self.lock();

        if inner.state == CircuitState::Open {
            let waited = inner
                .opened_at
                .map(|at| at.elapsed())
                .unwrap_or(self.wait_in_open);
            if waited >= self.wait_in_open {
                self.transition(&mut inner, CircuitState::HalfOpen);
            }
        }

        let admitted = match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen if inner.half_open_issued < self.permitted_in_half_open => {
                inner.half_open_issued += 1;
                true
            }
            _ => false,
        };

        if !admitted {
            tracing::debug!(policy = %self.name, state = ?inner.state, "Circuit rejected call");
            metrics::record_policy_rejection(&self.name, "circuit_open");
            return Err(GatewayError::CircuitOpen(self.name.clone()));
        }

        Ok(CallPermit {
            breaker: self,
            generation: inner.generation,
            completed: false,
        })
    }

    /// Run `f` under the breaker, recording its outcome.
    pub async fn call<T, F, Fut>(&self, f: F) -> Result<T, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let permit = self.try_acquire()?;
        let result = f().await;
        match &result {
            Ok(_) => permit.on_success(),
            Err(_) => permit.on_failure(),
        }
        result
    }

    fn record(&self, generation: u64, failed: bool) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.window.push_back(failed);
                if inner.window.len() > self.sliding_window_size {
                    inner.window.pop_front();
                }
                if inner.window.len() == self.sliding_window_size {
                    let failures = inner.window.iter().filter(|f| **f).count();
                    let rate = Self::rate(failures, self.sliding_window_size);
                    if rate >= self.failure_rate_threshold {
                        tracing::warn!(policy = %self.name, failure_rate = rate, "Failure rate above threshold");
                        self.transition(&mut inner, CircuitState::Open);
                    }
                }
            }
            CircuitState::HalfOpen => {
                inner.half_open_completed += 1;
                if failed {
                    inner.half_open_failures += 1;
                }
                if inner.half_open_completed >= self.permitted_in_half_open {
                    let rate = Self::rate(
                        inner.half_open_failures as usize,
                        self.permitted_in_half_open as usize,
                    );
                    let next = if rate >= self.failure_rate_threshold {
                        CircuitState::Open
                    } else {
                        CircuitState::Closed
                    };
                    self.transition(&mut inner, next);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn release(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation && inner.state == CircuitState::HalfOpen {
            inner.half_open_issued = inner.half_open_issued.saturating_sub(1);
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        inner.generation += 1;
        inner.half_open_issued = 0;
        inner.half_open_completed = 0;
        inner.half_open_failures = 0;

        match to {
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
                inner.window.clear();
                tracing::warn!(policy = %self.name, from = ?from, "Circuit opened");
            }
            CircuitState::HalfOpen => {
                tracing::info!(policy = %self.name, from = ?from, "Circuit half-open, probing");
            }
            CircuitState::Closed => {
                inner.opened_at = None;
                inner.window.clear();
                tracing::info!(policy = %self.name, from = ?from, "Circuit closed");
            }
        }
        metrics::record_circuit_state(&self.name, to.gauge());
    }

    fn rate(failures: usize, total: usize) -> f64 {
        failures as f64 * 100.0 / total as f64
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("circuit breaker mutex poisoned")
    }
}

/// Permission to run one call; report the outcome exactly once.
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    completed: bool,
}

impl CallPermit<'_> {
    pub fn on_success(mut self) {
        self.completed = true;
        self.breaker.record(self.generation, false);
    }

    pub fn on_failure(mut self) {
        self.completed = true;
        self.breaker.record(self.generation, true);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.breaker.release(self.generation);
        }
    }
}
