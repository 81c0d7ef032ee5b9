//! Access logging filter.
//!
//! Logs each request on entry and its final status and latency on exit.
//! Never short-circuits.

use std::time::Instant;

use async_trait::async_trait;

use crate::filter::{FilterAction, GatewayFilter};
use crate::gateway::MatchedRoute;
use crate::http::{GatewayRequest, GatewayResponse};

/// Entry timestamp stored in request extensions.
#[derive(Debug, Clone, Copy)]
struct RequestStart(Instant);

#[derive(Debug, Clone)]
pub struct LoggingFilter {
    order: i32,
}

impl LoggingFilter {
    pub fn new(order: i32) -> Self {
        Self { order }
    }
}

#[async_trait]
impl GatewayFilter for LoggingFilter {
    fn name(&self) -> &str {
        "logging"
    }

    fn order(&self) -> i32 {
        self.order
    }

    async fn on_request(&self, request: &mut GatewayRequest) -> FilterAction {
        request.extensions.insert(RequestStart(Instant::now()));
        tracing::info!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            "Request received"
        );
        FilterAction::Continue
    }

    async fn on_response(&self, request: &GatewayRequest, response: &mut GatewayResponse) {
        let latency_ms = request
            .extensions
            .get::<RequestStart>()
            .map(|start| start.0.elapsed().as_millis())
            .unwrap_or_default();
        let route = request
            .extensions
            .get::<MatchedRoute>()
            .map(|r| r.0.as_str())
            .unwrap_or("-");

        tracing::info!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            route,
            status = response.status.as_u16(),
            latency_ms = latency_ms as u64,
            "Request completed"
        );
    }
}
