//! Response handling and transformation.
//!
//! # Responsibilities
//! - Represent downstream, fallback and gateway-generated responses uniformly
//! - Map gateway errors to status codes and JSON bodies
//! - Convert into an Axum response at the edge

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;

/// A fully buffered response flowing back through the filter chain.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl GatewayResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Plain-text response.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        let mut resp = Self::new(status);
        resp.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        resp.body = Bytes::from(body.into());
        resp
    }

    /// JSON response.
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        let mut resp = Self::new(status);
        resp.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        resp.body = Bytes::from(value.to_string());
        resp
    }

    /// Render a gateway error with its mapped status and JSON body.
    pub fn from_error(err: &GatewayError) -> Self {
        Self::json(err.status(), &err.to_json())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
