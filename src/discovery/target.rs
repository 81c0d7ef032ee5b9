//! Route targets.

use std::fmt;

use thiserror::Error;
use url::Url;

/// Scheme marking a logical service target.
pub const SERVICE_SCHEME: &str = "lb://";

/// Where a route sends its traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Fixed base address, e.g. `http://127.0.0.1:8000`.
    Static(Url),
    /// Logical service name resolved per call, e.g. `lb://currency-exchange`.
    Service(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("empty target")]
    Empty,

    #[error("service target '{0}' has no service name")]
    MissingService(String),

    #[error("invalid target address '{0}'")]
    InvalidAddress(String),

    #[error("unsupported scheme in '{0}' (expected http, https or lb)")]
    UnsupportedScheme(String),
}

impl Target {
    pub fn parse(uri: &str) -> Result<Self, TargetError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(TargetError::Empty);
        }

        if let Some(service) = uri.strip_prefix(SERVICE_SCHEME) {
            let service = service.trim_end_matches('/');
            if service.is_empty() || service.contains('/') {
                return Err(TargetError::MissingService(uri.to_string()));
            }
            return Ok(Target::Service(service.to_string()));
        }

        let url = Url::parse(uri).map_err(|_| TargetError::InvalidAddress(uri.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(TargetError::UnsupportedScheme(uri.to_string()));
        }
        if url.host_str().is_none() {
            return Err(TargetError::InvalidAddress(uri.to_string()));
        }
        Ok(Target::Static(url))
    }

    pub fn is_service(&self) -> bool {
        matches!(self, Target::Service(_))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Static(url) => write!(f, "{}", url),
            Target::Service(name) => write!(f, "{}{}", SERVICE_SCHEME, name),
        }
    }
}

/// Parse a service instance address. `host:port` means plain http.
pub fn parse_address(address: &str) -> Result<Url, TargetError> {
    let address = address.trim();
    let candidate = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };
    match Target::parse(&candidate)? {
        Target::Static(url) => Ok(url),
        Target::Service(_) => Err(TargetError::InvalidAddress(address.to_string())),
    }
}
