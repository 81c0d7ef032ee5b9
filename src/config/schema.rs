//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Edge timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Route definitions, in registration order.
    pub routes: Vec<RouteConfig>,

    /// Named resilience policy tables.
    pub policies: PolicyTables,

    /// Named static fallback responses.
    pub fallbacks: BTreeMap<String, FallbackConfig>,

    /// Service discovery settings.
    pub discovery: DiscoveryConfig,

    /// Global filter settings.
    pub filters: FilterConfig,

    /// Credential table for the authentication filter.
    pub auth: AuthConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8765").
    pub bind_address: String,

    /// Maximum buffered request and response body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8765".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Edge timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Overall request deadline at the listener, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Route configuration mapping a path pattern to a target.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub id: String,

    /// Path pattern, e.g. `/currency-exchange/**` or `/get`.
    pub path: String,

    /// Target: `http://host:port` or `lb://service-name`.
    pub uri: String,

    /// Optional path rewrite applied before dispatch.
    pub rewrite: Option<RewriteConfig>,

    /// Headers appended to the outgoing request (incoming values kept).
    pub add_request_headers: BTreeMap<String, String>,

    /// Headers that replace incoming values of the same name.
    pub set_request_headers: BTreeMap<String, String>,

    /// Query parameters appended to the outgoing request.
    pub add_request_params: BTreeMap<String, String>,

    /// Query parameters that replace incoming values of the same name.
    pub set_request_params: BTreeMap<String, String>,

    /// Names of policies from [`PolicyTables`] bound to this route.
    pub policies: Vec<String>,

    /// Name of a fallback from `[fallbacks]`; error rendering when absent.
    pub fallback: Option<String>,

    /// Require a valid bearer credential.
    pub require_auth: bool,

    /// Role the credential must carry (implies `require_auth`).
    pub required_role: Option<String>,
}

/// Regex path rewrite, e.g. `/currency-conversion-new/(?<segment>.*)` ->
/// `/currency-conversion-feign/${segment}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RewriteConfig {
    pub regex: String,
    pub replacement: String,
}

/// Named policy parameter tables.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PolicyTables {
    pub retry: BTreeMap<String, RetryConfig>,
    pub circuit_breaker: BTreeMap<String, CircuitBreakerConfig>,
    pub rate_limiter: BTreeMap<String, RateLimiterConfig>,
    pub bulkhead: BTreeMap<String, BulkheadConfig>,
    pub time_limiter: BTreeMap<String, TimeLimiterConfig>,
}

impl PolicyTables {
    /// True if any table defines `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.retry.contains_key(name)
            || self.circuit_breaker.contains_key(name)
            || self.rate_limiter.contains_key(name)
            || self.bulkhead.contains_key(name)
            || self.time_limiter.contains_key(name)
    }

    /// Primitive kinds `name` defines; one name may cover several.
    pub fn kinds(&self, name: &str) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        if self.bulkhead.contains_key(name) {
            kinds.push("bulkhead");
        }
        if self.rate_limiter.contains_key(name) {
            kinds.push("rate_limiter");
        }
        if self.retry.contains_key(name) {
            kinds.push("retry");
        }
        if self.circuit_breaker.contains_key(name) {
            kinds.push("circuit_breaker");
        }
        if self.time_limiter.contains_key(name) {
            kinds.push("time_limiter");
        }
        kinds
    }
}

/// Delay strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first call.
    pub max_attempts: u32,

    /// Wait between attempts in milliseconds (base delay for exponential).
    pub wait_duration_ms: u64,

    /// Delay strategy.
    pub backoff: BackoffKind,

    /// Upper bound for exponential delays in milliseconds.
    pub max_wait_duration_ms: u64,

    /// Failure kinds that trigger another attempt.
    pub retry_on: Vec<FailureKind>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            wait_duration_ms: 500,
            backoff: BackoffKind::Fixed,
            max_wait_duration_ms: 10_000,
            retry_on: vec![
                FailureKind::Transport,
                FailureKind::Timeout,
                FailureKind::Resolution,
            ],
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failure percentage (0-100] at or above which the circuit opens.
    pub failure_rate_threshold: f64,

    /// Number of recent calls in the sliding window.
    pub sliding_window_size: u32,

    /// Time spent open before probing, in milliseconds.
    pub wait_duration_in_open_state_ms: u64,

    /// Probe calls allowed while half-open.
    pub permitted_calls_in_half_open_state: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 50.0,
            sliding_window_size: 100,
            wait_duration_in_open_state_ms: 60_000,
            permitted_calls_in_half_open_state: 10,
        }
    }
}

/// Rate limiter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Permits available per refresh period.
    pub limit_for_period: u32,

    /// Refresh period in milliseconds.
    pub limit_refresh_period_ms: u64,

    /// Maximum wait for a permit in milliseconds.
    pub admission_timeout_ms: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            limit_for_period: 50,
            limit_refresh_period_ms: 500,
            admission_timeout_ms: 5_000,
        }
    }
}

/// Bulkhead configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BulkheadConfig {
    /// Maximum concurrent in-flight calls.
    pub max_concurrent_calls: u32,

    /// Maximum wait for a free slot in milliseconds (0 = reject immediately).
    pub max_queue_wait_ms: u64,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 25,
            max_queue_wait_ms: 0,
        }
    }
}

/// Time limiter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeLimiterConfig {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for TimeLimiterConfig {
    fn default() -> Self {
        Self { timeout_ms: 1_000 }
    }
}

/// Static fallback response.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Status code returned by the fallback.
    pub status: u16,

    /// Content type of the body.
    pub content_type: String,

    /// Body template; `{error}`, `{path}` and `{route}` are substituted.
    pub body: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            status: 200,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: "fallback-response".to_string(),
        }
    }
}

/// Service discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Static service table: service id -> `host:port` addresses.
    pub services: BTreeMap<String, Vec<String>>,

    /// Implicit per-service routes.
    pub locator: LocatorConfig,
}

/// Discovery locator: one implicit route per known service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LocatorConfig {
    pub enabled: bool,

    /// Use the lower-cased service id in the route path.
    pub lower_case_service_id: bool,

    /// Policies bound to every locator route.
    pub policies: Vec<String>,

    /// Fallback bound to every locator route.
    pub fallback: Option<String>,
}

/// Global filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Enable the access logging filter.
    pub logging_enabled: bool,

    /// Order of the logging filter (lower runs earlier on the request path).
    pub logging_order: i32,

    /// Order of the authentication filter.
    pub auth_order: i32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            logging_enabled: true,
            logging_order: -2,
            auth_order: -1,
        }
    }
}

/// Credential table for the static token validator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub credentials: Vec<CredentialConfig>,
}

/// A single accepted bearer token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialConfig {
    pub token: String,
    pub principal: String,
    #[serde(default)]
    pub role: Option<String>,
    /// Expiry as unix seconds.
    #[serde(default)]
    pub expires_at: Option<u64>,
}
