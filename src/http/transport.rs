//! Downstream transport.
//!
//! # Responsibilities
//! - Define the `send(request) -> response | error` capability the policies wrap
//! - Provide the production implementation on top of the hyper-util client
//!
//! # Design Decisions
//! - Responses are buffered (bounded) so filters can inspect and rewrite them
//! - Hop-by-hop headers are stripped in both directions

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

use crate::error::GatewayError;
use crate::http::response::GatewayResponse;
use crate::security::headers::strip_hop_by_hop;

/// A fully prepared downstream request (route rewrite and injections applied).
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Errors raised by a [`Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid upstream url {0}")]
    InvalidUrl(String),

    #[error("failed to build upstream request: {0}")]
    Build(String),

    #[error("upstream request failed: {0}")]
    Request(String),

    #[error("failed to read upstream body: {0}")]
    Body(String),
}

impl From<TransportError> for GatewayError {
    fn from(err: TransportError) -> Self {
        GatewayError::TransportFailure(err.to_string())
    }
}

/// Sends a request to a downstream address.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<GatewayResponse, TransportError>;
}

/// HTTP/1.1 + HTTP/2 transport backed by the hyper-util legacy client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    max_body_bytes: usize,
}

impl HyperTransport {
    pub fn new(max_body_bytes: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            max_body_bytes,
        }
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: UpstreamRequest) -> Result<GatewayResponse, TransportError> {
        let uri: Uri = request
            .url
            .as_str()
            .parse()
            .map_err(|_| TransportError::InvalidUrl(request.url.to_string()))?;

        let mut headers = request.headers;
        strip_hop_by_hop(&mut headers);

        let mut builder = Request::builder().method(request.method).uri(uri);
        if let Some(h) = builder.headers_mut() {
            h.extend(headers);
        }
        let req = builder
            .body(Body::from(request.body))
            .map_err(|e| TransportError::Build(e.to_string()))?;

        let response: hyper::Response<hyper::body::Incoming> = self
            .client
            .request(req)
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let (mut parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        strip_hop_by_hop(&mut parts.headers);

        Ok(GatewayResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}
