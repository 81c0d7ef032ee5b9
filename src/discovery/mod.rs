//! Target resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Route uri
//!     → target.rs (Static http(s) address | Service lb://name)
//!
//! Per attempt, for Service targets:
//!     → resolver.rs (ServiceResolver: name → instances)
//!     → round_robin.rs (pick one instance per service)
//!
//! At gateway build time:
//!     → locator.rs (implicit /<service>/** routes)
//! ```
//!
//! # Design Decisions
//! - Resolution is a pluggable capability; the shipped resolver is a static table
//! - Resolution happens inside the policy-wrapped call, so its failures
//!   reach retries, the breaker and the fallback like any transport error

pub mod locator;
pub mod resolver;
pub mod round_robin;
pub mod target;

pub use locator::locator_routes;
pub use resolver::{ResolutionError, ServiceResolver, StaticResolver};
pub use round_robin::RoundRobin;
pub use target::{parse_address, Target, TargetError};
