//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing policies and fallbacks)
//! - Validate value ranges (attempts >= 1, thresholds within 0-100)
//! - Detect duplicate route ids and conflicting policy bindings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{GatewayConfig, PolicyTables, RouteConfig};
use crate::discovery::{parse_address, Target};
use crate::resilience::{check_bindings, StaticFallback};
use crate::routing::{PathPattern, RewriteRule};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One semantic problem, located by its config path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::new("listener.max_body_size", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", obs.log_level),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    validate_policies(&config.policies, &mut errors);

    for (name, fallback) in &config.fallbacks {
        if let Err(e) = StaticFallback::from_config(name, fallback) {
            errors.push(ValidationError::new(format!("fallbacks.{}", name), e.reason));
        }
    }

    let mut ids = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{}]", i);
        if route.id.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.id", field), "must not be empty"));
        } else if !ids.insert(route.id.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.id", field),
                format!("duplicate route id '{}'", route.id),
            ));
        }
        validate_route(&field, route, config, &mut errors);
    }

    for (service, addresses) in &config.discovery.services {
        for address in addresses {
            if parse_address(address).is_err() {
                errors.push(ValidationError::new(
                    format!("discovery.services.{}", service),
                    format!("invalid address '{}'", address),
                ));
            }
        }
    }
    let locator = &config.discovery.locator;
    if let Err(e) = check_bindings(&locator.policies, &config.policies) {
        errors.push(ValidationError::new("discovery.locator.policies", e.to_string()));
    }
    if let Some(name) = &locator.fallback {
        if !config.fallbacks.contains_key(name) {
            errors.push(ValidationError::new(
                "discovery.locator.fallback",
                format!("unknown fallback '{}'", name),
            ));
        }
    }

    let mut tokens = HashSet::new();
    for (i, credential) in config.auth.credentials.iter().enumerate() {
        if credential.token.is_empty() {
            errors.push(ValidationError::new(
                format!("auth.credentials[{}].token", i),
                "must not be empty",
            ));
        } else if !tokens.insert(credential.token.as_str()) {
            errors.push(ValidationError::new(
                format!("auth.credentials[{}].token", i),
                "duplicate token",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(
    field: &str,
    route: &RouteConfig,
    config: &GatewayConfig,
    errors: &mut Vec<ValidationError>,
) {
    if let Err(e) = PathPattern::parse(&route.path) {
        errors.push(ValidationError::new(format!("{}.path", field), e.to_string()));
    }
    if let Err(e) = Target::parse(&route.uri) {
        errors.push(ValidationError::new(format!("{}.uri", field), e.to_string()));
    }
    if let Some(rewrite) = &route.rewrite {
        if let Err(e) = RewriteRule::from_config(rewrite) {
            errors.push(ValidationError::new(format!("{}.rewrite", field), e.to_string()));
        }
    }

    let headers = route
        .add_request_headers
        .iter()
        .chain(route.set_request_headers.iter());
    for (name, value) in headers {
        if axum::http::HeaderName::from_bytes(name.as_bytes()).is_err()
            || axum::http::HeaderValue::from_str(value).is_err()
        {
            errors.push(ValidationError::new(
                format!("{}.headers", field),
                format!("invalid header '{}'", name),
            ));
        }
    }

    if let Err(e) = check_bindings(&route.policies, &config.policies) {
        errors.push(ValidationError::new(format!("{}.policies", field), e.to_string()));
    }
    if let Some(name) = &route.fallback {
        if !config.fallbacks.contains_key(name) {
            errors.push(ValidationError::new(
                format!("{}.fallback", field),
                format!("unknown fallback '{}'", name),
            ));
        }
    }
}

fn validate_policies(tables: &PolicyTables, errors: &mut Vec<ValidationError>) {
    for (name, retry) in &tables.retry {
        if retry.max_attempts == 0 {
            errors.push(ValidationError::new(
                format!("policies.retry.{}.max_attempts", name),
                "must be >= 1",
            ));
        }
    }
    for (name, cb) in &tables.circuit_breaker {
        let field = format!("policies.circuit_breaker.{}", name);
        if !(cb.failure_rate_threshold > 0.0 && cb.failure_rate_threshold <= 100.0) {
            errors.push(ValidationError::new(
                format!("{}.failure_rate_threshold", field),
                "must be within (0, 100]",
            ));
        }
        if cb.sliding_window_size == 0 {
            errors.push(ValidationError::new(
                format!("{}.sliding_window_size", field),
                "must be >= 1",
            ));
        }
        if cb.permitted_calls_in_half_open_state == 0 {
            errors.push(ValidationError::new(
                format!("{}.permitted_calls_in_half_open_state", field),
                "must be >= 1",
            ));
        }
    }
    for (name, rl) in &tables.rate_limiter {
        if rl.limit_refresh_period_ms == 0 {
            errors.push(ValidationError::new(
                format!("policies.rate_limiter.{}.limit_refresh_period_ms", name),
                "must be > 0",
            ));
        }
    }
    for (name, bh) in &tables.bulkhead {
        if bh.max_concurrent_calls == 0 {
            errors.push(ValidationError::new(
                format!("policies.bulkhead.{}.max_concurrent_calls", name),
                "must be >= 1",
            ));
        }
    }
    for (name, tl) in &tables.time_limiter {
        if tl.timeout_ms == 0 {
            errors.push(ValidationError::new(
                format!("policies.time_limiter.{}.timeout_ms", name),
                "must be > 0",
            ));
        }
    }
}
