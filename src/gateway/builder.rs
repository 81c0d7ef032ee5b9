//! Gateway assembly from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ConfigError, GatewayConfig};
use crate::discovery::{locator_routes, RoundRobin, ServiceResolver, StaticResolver};
use crate::filter::{AuthFilter, FilterChain, GatewayFilter, LoggingFilter, ProtectionTable};
use crate::gateway::dispatcher::{Gateway, RouteEntry};
use crate::http::Transport;
use crate::resilience::{ErrorFallback, Fallback, PolicyStack, StaticFallback};
use crate::routing::{Route, RouteTable};
use crate::security::{CredentialValidator, StaticTokenValidator};

/// Collects collaborators and extensions, then builds a [`Gateway`].
pub struct GatewayBuilder {
    config: GatewayConfig,
    transport: Arc<dyn Transport>,
    resolver: Option<Arc<dyn ServiceResolver>>,
    validator: Option<Arc<dyn CredentialValidator>>,
    filters: Vec<Arc<dyn GatewayFilter>>,
    fallbacks: HashMap<String, Arc<dyn Fallback>>,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            resolver: None,
            validator: None,
            filters: Vec::new(),
            fallbacks: HashMap::new(),
        }
    }

    /// Replace the static service table from `[discovery]`.
    pub fn resolver(mut self, resolver: Arc<dyn ServiceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Replace the static credential table from `[auth]`.
    pub fn validator(mut self, validator: Arc<dyn CredentialValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Add a filter alongside the built-in logging and auth filters.
    pub fn filter(mut self, filter: Arc<dyn GatewayFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Register a named fallback; overrides a `[fallbacks]` entry of the same name.
    pub fn fallback(mut self, name: impl Into<String>, fallback: Arc<dyn Fallback>) -> Self {
        self.fallbacks.insert(name.into(), fallback);
        self
    }

    pub fn build(self) -> Result<Gateway, ConfigError> {
        let config = self.config;

        let resolver: Arc<dyn ServiceResolver> = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(
                StaticResolver::new(&config.discovery.services)
                    .map_err(|e| ConfigError::Build(e.to_string()))?,
            ),
        };
        let validator: Arc<dyn CredentialValidator> = match self.validator {
            Some(validator) => validator,
            None => Arc::new(StaticTokenValidator::from_config(&config.auth)),
        };

        let mut fallbacks: HashMap<String, Arc<dyn Fallback>> = HashMap::new();
        for (name, cfg) in &config.fallbacks {
            let fallback = StaticFallback::from_config(name, cfg)
                .map_err(|e| ConfigError::Build(e.to_string()))?;
            fallbacks.insert(name.clone(), Arc::new(fallback));
        }
        fallbacks.extend(self.fallbacks);

        let mut route_configs = config.routes.clone();
        route_configs.extend(locator_routes(
            resolver.services().iter(),
            &config.discovery.locator,
        ));

        let mut routes = Vec::with_capacity(route_configs.len());
        let mut entries = HashMap::with_capacity(route_configs.len());
        let default_fallback: Arc<dyn Fallback> = Arc::new(ErrorFallback);
        for route_config in &route_configs {
            let route =
                Route::from_config(route_config).map_err(|e| ConfigError::Build(e.to_string()))?;

            let policies = PolicyStack::build(&route.id, &route.policies, &config.policies)
                .map_err(|e| ConfigError::Build(format!("route '{}': {}", route.id, e)))?;
            let fallback = match &route.fallback {
                Some(name) => fallbacks.get(name).cloned().ok_or_else(|| {
                    ConfigError::Build(format!("route '{}': unknown fallback '{}'", route.id, name))
                })?,
                None => default_fallback.clone(),
            };

            if entries.contains_key(&route.id) {
                return Err(ConfigError::Build(format!("duplicate route id '{}'", route.id)));
            }
            entries.insert(
                route.id.clone(),
                RouteEntry {
                    policies,
                    fallback,
                    named_fallback: route.fallback.is_some(),
                },
            );
            routes.push(route);
        }
        let routes = RouteTable::new(routes);

        let mut filters = self.filters;
        if config.filters.logging_enabled {
            filters.push(Arc::new(LoggingFilter::new(config.filters.logging_order)));
        }
        let protection = ProtectionTable::from_routes(&routes);
        if protection.protected_count() > 0 {
            filters.push(Arc::new(AuthFilter::new(
                config.filters.auth_order,
                validator,
                protection,
            )));
        }
        let filters = FilterChain::new(filters);

        tracing::info!(
            routes = routes.len(),
            filters = ?filters.names(),
            "Gateway assembled"
        );

        Ok(Gateway {
            routes,
            entries,
            filters,
            transport: self.transport,
            resolver,
            balancer: RoundRobin::new(),
        })
    }
}
