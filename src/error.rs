//! Gateway error taxonomy.
//!
//! Every failure a request can hit inside the gateway is one variant of
//! [`GatewayError`]. Policy-layer variants are redirected to the route's
//! fallback; only [`GatewayError::FallbackFailure`] escapes to the dispatcher.

use std::time::Duration;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Gateway-level errors.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("no route matches path {0}")]
    RouteNotFound(String),

    #[error("authentication required: {0}")]
    AuthRequired(String),

    #[error("access forbidden: {0}")]
    AuthForbidden(String),

    #[error("rate limiter '{0}' has no permit available")]
    RateLimitExceeded(String),

    #[error("bulkhead '{0}' is full")]
    BulkheadFull(String),

    #[error("circuit breaker '{0}' is open")]
    CircuitOpen(String),

    #[error("call did not complete within {0:?}")]
    Timeout(Duration),

    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        last: Box<GatewayError>,
    },

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("cannot resolve service '{0}'")]
    ResolutionFailure(String),

    #[error("fallback failed: {0}")]
    FallbackFailure(String),
}

/// Coarse classification of a [`GatewayError`].
///
/// Used by retry predicates, metrics labels and configuration
/// (`retry_on = ["transport", "timeout"]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RouteNotFound,
    Auth,
    RateLimit,
    Bulkhead,
    CircuitOpen,
    Timeout,
    RetryExhausted,
    Transport,
    Resolution,
    Fallback,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::RouteNotFound => "route_not_found",
            FailureKind::Auth => "auth",
            FailureKind::RateLimit => "rate_limit",
            FailureKind::Bulkhead => "bulkhead",
            FailureKind::CircuitOpen => "circuit_open",
            FailureKind::Timeout => "timeout",
            FailureKind::RetryExhausted => "retry_exhausted",
            FailureKind::Transport => "transport",
            FailureKind::Resolution => "resolution",
            FailureKind::Fallback => "fallback",
        }
    }
}

impl GatewayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            GatewayError::RouteNotFound(_) => FailureKind::RouteNotFound,
            GatewayError::AuthRequired(_) | GatewayError::AuthForbidden(_) => FailureKind::Auth,
            GatewayError::RateLimitExceeded(_) => FailureKind::RateLimit,
            GatewayError::BulkheadFull(_) => FailureKind::Bulkhead,
            GatewayError::CircuitOpen(_) => FailureKind::CircuitOpen,
            GatewayError::Timeout(_) => FailureKind::Timeout,
            GatewayError::RetryExhausted { .. } => FailureKind::RetryExhausted,
            GatewayError::TransportFailure(_) => FailureKind::Transport,
            GatewayError::ResolutionFailure(_) => FailureKind::Resolution,
            GatewayError::FallbackFailure(_) => FailureKind::Fallback,
        }
    }

    /// HTTP status this failure maps to when rendered directly.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::AuthRequired(_) => StatusCode::UNAUTHORIZED,
            GatewayError::AuthForbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::BulkheadFull(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::CircuitOpen(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::RetryExhausted { last, .. } => last.status(),
            GatewayError::TransportFailure(_) => StatusCode::BAD_GATEWAY,
            GatewayError::ResolutionFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::FallbackFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound(_) => "ROUTE_NOT_FOUND",
            GatewayError::AuthRequired(_) => "AUTH_REQUIRED",
            GatewayError::AuthForbidden(_) => "AUTH_FORBIDDEN",
            GatewayError::RateLimitExceeded(_) => "RATE_LIMIT_EXCEEDED",
            GatewayError::BulkheadFull(_) => "BULKHEAD_FULL",
            GatewayError::CircuitOpen(_) => "CIRCUIT_OPEN",
            GatewayError::Timeout(_) => "TIMEOUT",
            GatewayError::RetryExhausted { .. } => "RETRY_EXHAUSTED",
            GatewayError::TransportFailure(_) => "TRANSPORT_FAILURE",
            GatewayError::ResolutionFailure(_) => "RESOLUTION_FAILURE",
            GatewayError::FallbackFailure(_) => "FALLBACK_FAILURE",
        }
    }

    /// The failure that actually happened downstream, looking through
    /// [`GatewayError::RetryExhausted`].
    pub fn root(&self) -> &GatewayError {
        match self {
            GatewayError::RetryExhausted { last, .. } => last.root(),
            other => other,
        }
    }

    /// JSON error body: `{"error":{"code":..,"message":..}}`.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        })
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatewayError::RouteNotFound("/x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(GatewayError::AuthRequired("missing".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GatewayError::AuthForbidden("role".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(GatewayError::Timeout(Duration::from_secs(1)).status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            GatewayError::FallbackFailure("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_retry_exhausted_reports_last_failure() {
        let err = GatewayError::RetryExhausted {
            attempts: 3,
            last: Box::new(GatewayError::Timeout(Duration::from_millis(50))),
        };
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.kind(), FailureKind::RetryExhausted);
        assert_eq!(err.root().kind(), FailureKind::Timeout);
    }

    #[test]
    fn test_json_body() {
        let body = GatewayError::CircuitOpen("backend-a".into()).to_json();
        assert_eq!(body["error"]["code"], "CIRCUIT_OPEN");
        assert!(body["error"]["message"].as_str().unwrap().contains("backend-a"));
    }
}
