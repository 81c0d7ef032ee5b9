//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → Gateway::from_config builds routes, filters and policy stacks
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → HTTP server builds a new Gateway and swaps it in atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AuthConfig, BackoffKind, BulkheadConfig, CircuitBreakerConfig, CredentialConfig,
    DiscoveryConfig, FallbackConfig, FilterConfig, GatewayConfig, ListenerConfig, LocatorConfig,
    LogFormat, ObservabilityConfig, PolicyTables, RateLimiterConfig, RetryConfig, RewriteConfig,
    RouteConfig, TimeLimiterConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
