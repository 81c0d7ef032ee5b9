//! Fallback responses for failed policy-wrapped calls.
//!
//! A fallback receives the original request, the route it matched and the
//! failure that ended the call. It must not fail under normal operation; an
//! error here is a configuration defect and surfaces as `FallbackFailure`.

use axum::body::Bytes;
use axum::http::{header, HeaderValue, StatusCode};
use thiserror::Error;

use crate::config::FallbackConfig;
use crate::error::GatewayError;
use crate::http::{GatewayRequest, GatewayResponse};

#[derive(Debug, Error)]
#[error("fallback '{name}' failed: {reason}")]
pub struct FallbackError {
    pub name: String,
    pub reason: String,
}

impl From<FallbackError> for GatewayError {
    fn from(err: FallbackError) -> Self {
        GatewayError::FallbackFailure(err.to_string())
    }
}

/// Substitute result producer.
pub trait Fallback: Send + Sync {
    fn name(&self) -> &str;

    fn respond(
        &self,
        request: &GatewayRequest,
        route_id: &str,
        failure: &GatewayError,
    ) -> Result<GatewayResponse, FallbackError>;
}

/// Renders the failure with its mapped status and JSON error body.
#[derive(Debug, Default, Clone)]
pub struct ErrorFallback;

impl Fallback for ErrorFallback {
    fn name(&self) -> &str {
        "error"
    }

    fn respond(
        &self,
        _request: &GatewayRequest,
        _route_id: &str,
        failure: &GatewayError,
    ) -> Result<GatewayResponse, FallbackError> {
        Ok(GatewayResponse::from_error(failure))
    }
}

/// Fixed response with `{error}`, `{path}` and `{route}` placeholders.
#[derive(Debug, Clone)]
pub struct StaticFallback {
    name: String,
    status: StatusCode,
    content_type: HeaderValue,
    template: String,
}

impl StaticFallback {
    pub fn from_config(name: &str, config: &FallbackConfig) -> Result<Self, FallbackError> {
        let invalid = |reason: String| FallbackError {
            name: name.to_string(),
            reason,
        };
        let status = StatusCode::from_u16(config.status)
            .map_err(|_| invalid(format!("invalid status {}", config.status)))?;
        let content_type = HeaderValue::from_str(&config.content_type)
            .map_err(|_| invalid(format!("invalid content type '{}'", config.content_type)))?;

        Ok(Self {
            name: name.to_string(),
            status,
            content_type,
            template: config.body.clone(),
        })
    }
}

impl Fallback for StaticFallback {
    fn name(&self) -> &str {
        &self.name
    }

    fn respond(
        &self,
        request: &GatewayRequest,
        route_id: &str,
        failure: &GatewayError,
    ) -> Result<GatewayResponse, FallbackError> {
        let body = self
            .template
            .replace("{error}", &failure.to_string())
            .replace("{path}", &request.path)
            .replace("{route}", route_id);

        let mut response = GatewayResponse::new(self.status);
        response
            .headers
            .insert(header::CONTENT_TYPE, self.content_type.clone());
        response.body = Bytes::from(body);
        Ok(response)
    }
}
