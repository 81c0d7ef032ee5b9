//! Resilient edge gateway library.
//!
//! Routes inbound HTTP requests to backend targets through an ordered filter
//! chain and a per-route stack of resilience policies.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────────┐
//!                 │                       EDGE GATEWAY                       │
//!                 │                                                          │
//!   Client ──────▶│ http::server ─▶ filter chain ─▶ routing ─▶ resilience ───┼──▶ Backend
//!                 │                 (log, auth)     (match,    (bulkhead,    │   (static or
//!   Client ◀──────│ http::response ◀─ filter chain ◀─ fallback  rate limit,   │    lb://name via
//!                 │                                            retry, cb,    │    discovery)
//!                 │                                            time limit)   │
//!                 │                                                          │
//!                 │  Cross-cutting: config (TOML, hot reload), observability │
//!                 │  (tracing, Prometheus), lifecycle (signals, shutdown)    │
//!                 └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use error::{FailureKind, GatewayError, GatewayResult};
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
