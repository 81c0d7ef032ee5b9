//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber (HTTP server) stops accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown_signal() resolves → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - Ordered startup in main: config, logging, metrics, gateway, listener
//! - Ordered shutdown: stop accept, drain, close

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
