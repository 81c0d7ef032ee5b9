//! Service name resolution.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::discovery::target::parse_address;
use crate::error::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("unknown service '{0}'")]
    UnknownService(String),

    #[error("service '{0}' has no instances")]
    NoInstances(String),

    #[error("service '{service}' has invalid address '{address}'")]
    InvalidAddress { service: String, address: String },
}

impl ResolutionError {
    pub fn service(&self) -> &str {
        match self {
            ResolutionError::UnknownService(s) | ResolutionError::NoInstances(s) => s,
            ResolutionError::InvalidAddress { service, .. } => service,
        }
    }
}

impl From<ResolutionError> for GatewayError {
    fn from(err: ResolutionError) -> Self {
        GatewayError::ResolutionFailure(err.service().to_string())
    }
}

/// Maps a logical service name to its reachable instances.
#[async_trait]
pub trait ServiceResolver: Send + Sync {
    async fn resolve(&self, service: &str) -> Result<Vec<Url>, ResolutionError>;

    /// Known service ids, used to generate locator routes.
    fn services(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Fixed service table. Service ids are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    /// Lower-cased id -> (id as configured, instances).
    services: HashMap<String, (String, Vec<Url>)>,
}

impl StaticResolver {
    pub fn new(services: &BTreeMap<String, Vec<String>>) -> Result<Self, ResolutionError> {
        let mut table = HashMap::with_capacity(services.len());
        for (service, addresses) in services {
            let urls = addresses
                .iter()
                .map(|address| {
                    parse_address(address).map_err(|_| ResolutionError::InvalidAddress {
                        service: service.clone(),
                        address: address.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            table.insert(service.to_lowercase(), (service.clone(), urls));
        }
        Ok(Self { services: table })
    }
}

#[async_trait]
impl ServiceResolver for StaticResolver {
    async fn resolve(&self, service: &str) -> Result<Vec<Url>, ResolutionError> {
        let (_, instances) = self
            .services
            .get(&service.to_lowercase())
            .ok_or_else(|| ResolutionError::UnknownService(service.to_string()))?;
        if instances.is_empty() {
            return Err(ResolutionError::NoInstances(service.to_string()));
        }
        Ok(instances.clone())
    }

    fn services(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.services.values().map(|(id, _)| id.clone()).collect();
        ids.sort();
        ids
    }
}
