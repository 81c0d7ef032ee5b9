//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, body limit)
//!     → request.rs (buffer body, build GatewayRequest)
//!     → [gateway: filters, routing, policies]
//!     → transport.rs (downstream call)
//!     → response.rs (GatewayResponse → Axum response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod transport;

pub use request::{GatewayRequest, X_REQUEST_ID};
pub use response::GatewayResponse;
pub use server::{GatewayFactory, HttpServer};
pub use transport::{HyperTransport, Transport, TransportError, UpstreamRequest};
