//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Downstream call for a matched route:
//!     → composer.rs (PolicyStack built from the route's policy names)
//!     → bulkhead.rs (concurrency slot, held for the whole call)
//!     → rate_limiter.rs (fixed-window permit)
//!     → retries.rs (attempt loop, backoff.rs between attempts)
//!         → circuit_breaker.rs (per-attempt admission + outcome recording)
//!         → timeouts.rs (per-attempt deadline)
//!         → transport
//!     → On failure: fallback.rs (route's single fallback)
//! ```
//!
//! # Design Decisions
//! - Every primitive is stateful per route and per policy name
//! - Shared counters live behind a per-primitive lock; no global lock
//! - Fallbacks never fail a request silently; their errors are fatal (500)

pub mod backoff;
pub mod bulkhead;
pub mod circuit_breaker;
pub mod composer;
pub mod fallback;
pub mod rate_limiter;
pub mod retries;
pub mod timeouts;

pub use bulkhead::Bulkhead;
pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitState};
pub use composer::{check_bindings, BindingError, PolicyStack};
pub use fallback::{ErrorFallback, Fallback, FallbackError, StaticFallback};
pub use rate_limiter::RateLimiter;
pub use retries::{Retry, RetryPredicate};
pub use timeouts::TimeLimiter;
