//! Gateway dispatcher subsystem.
//!
//! # Data Flow
//! ```text
//! GatewayRequest
//!     → filter chain, request phase
//!         → terminal response? skip to response phase
//!     → route table match (404 when nothing matches)
//!     → Route::prepare (rewrite, header/param injection, request id)
//!     → PolicyStack::execute, per attempt:
//!         → resolve target (static or lb://service, round robin)
//!         → Transport::send (5xx counts as failure)
//!     → on failure: route fallback
//!     → filter chain, response phase
//!     → GatewayResponse
//! ```
//!
//! # Design Decisions
//! - `Gateway` is immutable; a reload builds a new one with fresh policy state
//! - Collaborators (transport, resolver, validator) are trait objects
//! - Fallback errors are the only failures surfaced as 500

pub mod builder;
pub mod dispatcher;

pub use builder::GatewayBuilder;
pub use dispatcher::{Gateway, MatchedRoute};
