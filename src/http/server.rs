//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router forwarding every method and path to the gateway
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Bind server to listener
//! - Swap in a freshly built gateway when the configuration changes
//! - Drain in-flight requests on shutdown

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ConfigError, GatewayConfig};
use crate::gateway::Gateway;
use crate::http::request::GatewayRequest;
use crate::http::transport::{HyperTransport, Transport};

/// Builds a gateway from configuration; used at startup and on every reload.
pub type GatewayFactory = Arc<dyn Fn(GatewayConfig) -> Result<Gateway, ConfigError> + Send + Sync>;

/// Application state injected into handlers.
#[derive(Clone)]
struct AppState {
    gateway: Arc<ArcSwap<Gateway>>,
    max_body_size: usize,
}

/// HTTP front end of the gateway.
pub struct HttpServer {
    config: GatewayConfig,
    gateway: Arc<ArcSwap<Gateway>>,
    factory: GatewayFactory,
}

impl HttpServer {
    /// Server with the hyper transport and the configured resolver and credentials.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        let transport: Arc<dyn Transport> =
            Arc::new(HyperTransport::new(config.listener.max_body_size));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(
        config: GatewayConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        let factory: GatewayFactory =
            Arc::new(move |config: GatewayConfig| Gateway::from_config(config, transport.clone()));
        Self::with_factory(config, factory)
    }

    /// Server whose gateways come from `factory`, so custom collaborators
    /// survive reloads.
    pub fn with_factory(config: GatewayConfig, factory: GatewayFactory) -> Result<Self, ConfigError> {
        let gateway = factory(config.clone())?;
        Ok(Self {
            config,
            gateway: Arc::new(ArcSwap::from_pointee(gateway)),
            factory,
        })
    }

    /// The gateway currently serving traffic.
    pub fn gateway(&self) -> Arc<Gateway> {
        self.gateway.load_full()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(&self) -> Router {
        let state = AppState {
            gateway: self.gateway.clone(),
            max_body_size: self.config.listener.max_body_size,
        };

        Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(self.config.listener.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        self.config.timeouts.request_secs,
                    ))),
            )
    }

    /// Run the server until `shutdown` fires. Configurations received on
    /// `config_updates` replace the gateway; listener settings stay as started.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let gateway = self.gateway.clone();
        let factory = self.factory.clone();
        let reloader = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                match factory(new_config) {
                    Ok(new_gateway) => {
                        gateway.store(Arc::new(new_gateway));
                        tracing::info!("Gateway reloaded");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected new configuration; keeping current gateway");
                    }
                }
            }
        });

        let app = self.build_router();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown requested, draining connections");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
        }
    };

    let request = GatewayRequest::from_parts(parts, body);
    let gateway = state.gateway.load_full();
    gateway.handle(request).await.into_response()
}
