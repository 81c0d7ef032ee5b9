//! Filter chain subsystem.
//!
//! # Data Flow
//! ```text
//! Request phase (ascending order):
//!     logging.rs (-2) → auth.rs (-1) → custom filters ...
//!     first short-circuit response stops the walk
//!
//! Response phase (descending order):
//!     only filters whose request phase ran, innermost first
//! ```
//!
//! # Design Decisions
//! - Plain ordered list of trait objects; equal orders keep insertion order
//! - Only filters declaring the short-circuit capability may end the chain
//! - Per-request filter state lives in the request's extensions

pub mod auth;
pub mod logging;

pub use auth::{AccessRequirement, AuthFilter, ProtectionTable};
pub use logging::LoggingFilter;

use std::sync::Arc;

use async_trait::async_trait;

use crate::http::{GatewayRequest, GatewayResponse};

/// Outcome of a filter's request phase.
#[derive(Debug)]
pub enum FilterAction {
    Continue,
    /// Terminal response; honoured only from short-circuit filters.
    Respond(GatewayResponse),
}

/// A request/response interceptor.
#[async_trait]
pub trait GatewayFilter: Send + Sync {
    fn name(&self) -> &str;

    /// Lower runs earlier on the request path and later on the response path.
    fn order(&self) -> i32;

    /// May this filter terminate the chain with its own response?
    fn short_circuit(&self) -> bool {
        false
    }

    async fn on_request(&self, request: &mut GatewayRequest) -> FilterAction;

    async fn on_response(&self, _request: &GatewayRequest, _response: &mut GatewayResponse) {}
}

/// Result of the request phase.
#[derive(Debug)]
pub struct RequestPhase {
    /// Number of filters whose request phase ran.
    pub entered: usize,
    /// Terminal response produced by a short-circuit filter.
    pub terminal: Option<GatewayResponse>,
}

/// Ordered filter pipeline.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn GatewayFilter>>,
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|x| (x.order(), x.name().to_string())))
            .finish()
    }
}

impl FilterChain {
    pub fn new(mut filters: Vec<Arc<dyn GatewayFilter>>) -> Self {
        filters.sort_by_key(|f| f.order());
        Self { filters }
    }

    /// Add a filter, keeping the chain sorted.
    pub fn with(mut self, filter: Arc<dyn GatewayFilter>) -> Self {
        self.filters.push(filter);
        self.filters.sort_by_key(|f| f.order());
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub async fn run_request(&self, request: &mut GatewayRequest) -> RequestPhase {
        for (index, filter) in self.filters.iter().enumerate() {
            match filter.on_request(request).await {
                FilterAction::Continue => {}
                FilterAction::Respond(response) if filter.short_circuit() => {
                    tracing::debug!(
                        request_id = %request.id,
                        filter = filter.name(),
                        status = response.status.as_u16(),
                        "Filter short-circuited request"
                    );
                    return RequestPhase {
                        entered: index + 1,
                        terminal: Some(response),
                    };
                }
                FilterAction::Respond(_) => {
                    tracing::error!(
                        request_id = %request.id,
                        filter = filter.name(),
                        "Filter without short-circuit capability produced a response; ignored"
                    );
                }
            }
        }
        RequestPhase {
            entered: self.filters.len(),
            terminal: None,
        }
    }

    /// Run the response phase over the first `entered` filters, in reverse.
    pub async fn run_response(
        &self,
        entered: usize,
        request: &GatewayRequest,
        response: &mut GatewayResponse,
    ) {
        let entered = entered.min(self.filters.len());
        for filter in self.filters[..entered].iter().rev() {
            filter.on_response(request, response).await;
        }
    }
}
