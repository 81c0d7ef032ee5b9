//! Implicit routes for discovered services.
//!
//! With the locator enabled, every service `S` is reachable at `/S/**`. The
//! service prefix is stripped before forwarding, so `/S/rest` reaches
//! `lb://S` as `/rest`.

use crate::config::{LocatorConfig, RewriteConfig, RouteConfig};
use crate::discovery::target::SERVICE_SCHEME;

/// Route id prefix for generated routes.
pub const LOCATOR_ROUTE_PREFIX: &str = "locator_";

/// Build one route per service id, in the order given.
pub fn locator_routes<'a, I>(services: I, config: &LocatorConfig) -> Vec<RouteConfig>
where
    I: IntoIterator<Item = &'a String>,
{
    if !config.enabled {
        return Vec::new();
    }

    services
        .into_iter()
        .map(|service| {
            let segment = if config.lower_case_service_id {
                service.to_lowercase()
            } else {
                service.clone()
            };
            RouteConfig {
                id: format!("{}{}", LOCATOR_ROUTE_PREFIX, service),
                path: format!("/{}/**", segment),
                uri: format!("{}{}", SERVICE_SCHEME, service),
                rewrite: Some(RewriteConfig {
                    regex: format!("^/{}/?(?<remaining>.*)$", regex::escape(&segment)),
                    replacement: "/${remaining}".to_string(),
                }),
                policies: config.policies.clone(),
                fallback: config.fallback.clone(),
                ..RouteConfig::default()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_locator_adds_nothing() {
        let services = vec!["A".to_string()];
        assert!(locator_routes(&services, &LocatorConfig::default()).is_empty());
    }

    #[test]
    fn test_lower_case_service_id() {
        let services = vec!["CURRENCY-EXCHANGE".to_string()];
        let config = LocatorConfig {
            enabled: true,
            lower_case_service_id: true,
            policies: vec!["default".into()],
            fallback: None,
        };
        let routes = locator_routes(&services, &config);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/currency-exchange/**");
        assert_eq!(routes[0].uri, "lb://CURRENCY-EXCHANGE");
        assert_eq!(routes[0].policies, vec!["default".to_string()]);
    }
}
