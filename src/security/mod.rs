//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (auth filter):
//!     → credentials.rs (extract bearer token, verify, build AuthContext)
//!
//! Outgoing request / incoming response:
//!     → headers.rs (strip hop-by-hop, propagate request id)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any credential problem
//! - Token verification is a pluggable capability
//! - No trust in client input

pub mod credentials;
pub mod headers;

pub use credentials::{
    bearer_token, AuthContext, Claims, CredentialError, CredentialValidator, InvalidToken,
    StaticTokenValidator,
};
