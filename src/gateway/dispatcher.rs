//! Request dispatch.
//!
//! # Responsibilities
//! - Run the filter chain around every request
//! - Match the route and prepare the downstream request
//! - Resolve the target and call the transport through the route's policies
//! - Turn policy-layer failures into the route's fallback response

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use url::Url;

use crate::config::{ConfigError, GatewayConfig};
use crate::discovery::{RoundRobin, ServiceResolver, Target};
use crate::error::GatewayError;
use crate::filter::FilterChain;
use crate::gateway::builder::GatewayBuilder;
use crate::http::{GatewayRequest, GatewayResponse, Transport, UpstreamRequest};
use crate::observability::metrics;
use crate::resilience::{Fallback, PolicyStack};
use crate::routing::{Forward, Route, RouteTable};
use crate::security::headers::set_request_id;

/// Id of the route that served a request, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute(pub String);

/// Per-route runtime state.
pub(crate) struct RouteEntry {
    pub(crate) policies: PolicyStack,
    pub(crate) fallback: Arc<dyn Fallback>,
    pub(crate) named_fallback: bool,
}

impl RouteEntry {
    /// Whether upstream 5xx responses are treated as failures. Routes with
    /// neither policies nor a named fallback pass them through.
    fn guards_server_errors(&self) -> bool {
        self.named_fallback || !self.policies.is_empty()
    }
}

/// The assembled gateway. Immutable; rebuilt on configuration reload.
pub struct Gateway {
    pub(crate) routes: RouteTable,
    pub(crate) entries: HashMap<String, RouteEntry>,
    pub(crate) filters: FilterChain,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) resolver: Arc<dyn ServiceResolver>,
    pub(crate) balancer: RoundRobin,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("routes", &self.routes.len())
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn builder(config: GatewayConfig, transport: Arc<dyn Transport>) -> GatewayBuilder {
        GatewayBuilder::new(config, transport)
    }

    /// Build with the static resolver and credential table from `config`.
    pub fn from_config(
        config: GatewayConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        Self::builder(config, transport).build()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Policy instances bound to a route.
    pub fn policies(&self, route_id: &str) -> Option<&PolicyStack> {
        self.entries.get(route_id).map(|entry| &entry.policies)
    }

    /// Handle one inbound request. Never fails: every outcome is a response.
    pub async fn handle(&self, mut request: GatewayRequest) -> GatewayResponse {
        let start = Instant::now();

        let phase = self.filters.run_request(&mut request).await;
        let mut response = match phase.terminal {
            Some(response) => response,
            None => self.dispatch(&mut request).await,
        };
        self.filters
            .run_response(phase.entered, &request, &mut response)
            .await;

        set_request_id(&mut response.headers, &request.id);
        let route = request
            .extensions
            .get::<MatchedRoute>()
            .map(|r| r.0.as_str())
            .unwrap_or("none");
        metrics::record_request(route, response.status.as_u16(), start);
        response
    }

    async fn dispatch(&self, request: &mut GatewayRequest) -> GatewayResponse {
        let matched = self
            .routes
            .match_path(&request.path)
            .and_then(|route| self.entries.get(&route.id).map(|entry| (route, entry)));
        let Some((route, entry)) = matched else {
            tracing::debug!(request_id = %request.id, path = %request.path, "No route matched");
            return GatewayResponse::from_error(&GatewayError::RouteNotFound(request.path.clone()));
        };
        request.extensions.insert(MatchedRoute(route.id.clone()));

        let forward = route.prepare(request);
        tracing::debug!(
            request_id = %request.id,
            route = %route.id,
            target = %route.target,
            downstream_path = %forward.path,
            "Dispatching request"
        );

        let guard = entry.guards_server_errors();
        let result = entry
            .policies
            .execute(|| self.forward_once(route, &forward, guard))
            .await;

        match result {
            Ok(response) => response,
            Err(failure) => self.recover(entry, request, route, failure),
        }
    }

    /// One downstream attempt: resolve, send, classify.
    async fn forward_once(
        &self,
        route: &Route,
        forward: &Forward,
        guard_server_errors: bool,
    ) -> Result<GatewayResponse, GatewayError> {
        let base = match &route.target {
            Target::Static(url) => url.clone(),
            Target::Service(service) => {
                let instances = self.resolver.resolve(service).await?;
                self.balancer
                    .next(service, &instances)
                    .cloned()
                    .ok_or_else(|| GatewayError::ResolutionFailure(service.clone()))?
            }
        };

        let upstream = UpstreamRequest {
            method: forward.method.clone(),
            url: downstream_url(
                &base,
                &forward.path,
                forward.raw_query.as_deref(),
                &forward.query,
            ),
            headers: forward.headers.clone(),
            body: forward.body.clone(),
        };
        let response = self.transport.send(upstream).await?;

        if guard_server_errors && response.status.is_server_error() {
            return Err(GatewayError::TransportFailure(format!(
                "upstream responded {}",
                response.status
            )));
        }
        Ok(response)
    }

    fn recover(
        &self,
        entry: &RouteEntry,
        request: &GatewayRequest,
        route: &Route,
        failure: GatewayError,
    ) -> GatewayResponse {
        let kind = failure.root().kind();
        metrics::record_fallback(&route.id, kind.as_str());
        tracing::warn!(
            request_id = %request.id,
            route = %route.id,
            fallback = entry.fallback.name(),
            error = %failure,
            "Downstream call failed, using fallback"
        );

        match entry.fallback.respond(request, &route.id, &failure) {
            Ok(response) => response,
            Err(e) => {
                let fatal = GatewayError::from(e);
                tracing::error!(request_id = %request.id, route = %route.id, error = %fatal, "Fallback failed");
                GatewayResponse::from_error(&fatal)
            }
        }
    }
}

/// Join the target base address with the downstream path and query. A raw
/// query is used as is; otherwise `query` is encoded.
fn downstream_url(
    base: &Url,
    path: &str,
    raw_query: Option<&str>,
    query: &[(String, String)],
) -> Url {
    let mut url = base.clone();
    let joined = format!("{}{}", base.path().trim_end_matches('/'), path);
    url.set_path(&joined);
    if let Some(raw) = raw_query {
        url.set_query(Some(raw));
    } else if query.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(query);
    }
    url
}
