//! Route lookup and request preparation.
//!
//! # Responsibilities
//! - Compile route configuration into immutable routes
//! - Look up the matching route for a path
//! - Prepare the downstream request (rewrite, header/param injection)
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Match order computed once: exact, then longest literal, then registration
//! - O(n) scan (acceptable for typical route counts)
//! - Explicit `None` rather than silent default

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use thiserror::Error;

use crate::config::RouteConfig;
use crate::discovery::{Target, TargetError};
use crate::http::GatewayRequest;
use crate::routing::matcher::{PathPattern, PatternError};
use crate::routing::rewrite::RewriteRule;
use crate::security::headers::{set_request_id, strip_hop_by_hop};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route has no id")]
    MissingId,

    #[error("route '{id}': {source}")]
    Pattern { id: String, source: PatternError },

    #[error("route '{id}': {source}")]
    Target { id: String, source: TargetError },

    #[error("route '{id}': invalid rewrite regex: {source}")]
    Rewrite { id: String, source: regex::Error },

    #[error("route '{id}': invalid header '{name}'")]
    Header { id: String, name: String },
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub id: String,
    pub pattern: PathPattern,
    pub target: Target,
    pub rewrite: Option<RewriteRule>,
    pub add_headers: Vec<(HeaderName, HeaderValue)>,
    pub set_headers: Vec<(HeaderName, HeaderValue)>,
    pub add_params: Vec<(String, String)>,
    pub set_params: Vec<(String, String)>,
    pub policies: Vec<String>,
    pub fallback: Option<String>,
    pub require_auth: bool,
    pub required_role: Option<String>,
}

/// Downstream request for a matched route, before target resolution.
#[derive(Debug, Clone)]
pub struct Forward {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Received query string, forwarded verbatim when neither the route nor
    /// a filter changed the parameters.
    pub raw_query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Route {
    pub fn from_config(config: &RouteConfig) -> Result<Self, RouteError> {
        if config.id.trim().is_empty() {
            return Err(RouteError::MissingId);
        }
        let id = config.id.clone();

        let pattern = PathPattern::parse(&config.path).map_err(|source| RouteError::Pattern {
            id: id.clone(),
            source,
        })?;
        let target = Target::parse(&config.uri).map_err(|source| RouteError::Target {
            id: id.clone(),
            source,
        })?;
        let rewrite = config
            .rewrite
            .as_ref()
            .map(RewriteRule::from_config)
            .transpose()
            .map_err(|source| RouteError::Rewrite {
                id: id.clone(),
                source,
            })?;

        let add_headers = compile_headers(&id, config.add_request_headers.iter())?;
        let set_headers = compile_headers(&id, config.set_request_headers.iter())?;
        let pairs = |map: &std::collections::BTreeMap<String, String>| {
            map.iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Vec<_>>()
        };

        Ok(Self {
            add_headers,
            set_headers,
            add_params: pairs(&config.add_request_params),
            set_params: pairs(&config.set_request_params),
            policies: config.policies.clone(),
            fallback: config.fallback.clone(),
            require_auth: config.require_auth || config.required_role.is_some(),
            required_role: config.required_role.clone(),
            id,
            pattern,
            target,
            rewrite,
        })
    }

    /// Effective downstream path for `path`.
    pub fn downstream_path(&self, path: &str) -> String {
        match &self.rewrite {
            Some(rule) => rule.apply(path),
            None => path.to_string(),
        }
    }

    /// Build the downstream request: rewrite the path, drop hop-by-hop
    /// headers, apply header and parameter injection, propagate the request id.
    pub fn prepare(&self, request: &GatewayRequest) -> Forward {
        let mut headers = request.headers.clone();
        strip_hop_by_hop(&mut headers);
        for (name, value) in &self.add_headers {
            headers.append(name.clone(), value.clone());
        }
        for (name, value) in &self.set_headers {
            headers.insert(name.clone(), value.clone());
        }
        set_request_id(&mut headers, &request.id);

        let raw_query = if self.add_params.is_empty() && self.set_params.is_empty() {
            request.unmodified_raw_query().map(str::to_string)
        } else {
            None
        };
        let mut query = request.query.clone();
        query.extend(self.add_params.iter().cloned());
        for (name, value) in &self.set_params {
            query.retain(|(k, _)| k != name);
            query.push((name.clone(), value.clone()));
        }

        Forward {
            method: request.method.clone(),
            path: self.downstream_path(&request.path),
            query,
            raw_query,
            headers,
            body: request.body.clone(),
        }
    }
}

fn compile_headers<'a, I>(id: &str, headers: I) -> Result<Vec<(HeaderName, HeaderValue)>, RouteError>
where
    I: Iterator<Item = (&'a String, &'a String)>,
{
    headers
        .map(|(name, value)| {
            let invalid = || RouteError::Header {
                id: id.to_string(),
                name: name.clone(),
            };
            let name_parsed = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let value_parsed = HeaderValue::from_str(value).map_err(|_| invalid())?;
            Ok((name_parsed, value_parsed))
        })
        .collect()
}

/// Immutable, ordered route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    /// Registration order.
    routes: Vec<Arc<Route>>,
    /// Indices into `routes` in match order.
    order: Vec<usize>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        let routes: Vec<Arc<Route>> = routes.into_iter().map(Arc::new).collect();
        let mut order: Vec<usize> = (0..routes.len()).collect();
        // Stable sort keeps registration order among equally specific routes.
        order.sort_by(|a, b| routes[*a].pattern.specificity_cmp(&routes[*b].pattern));
        Self { routes, order }
    }

    pub fn from_configs(configs: &[RouteConfig]) -> Result<Self, RouteError> {
        let routes = configs
            .iter()
            .map(Route::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(routes))
    }

    /// Most specific route whose pattern matches `path`.
    pub fn match_path(&self, path: &str) -> Option<&Arc<Route>> {
        self.in_match_order()
            .find(|route| route.pattern.matches(path))
    }

    /// Routes in the order `match_path` tries them.
    pub fn in_match_order(&self) -> impl Iterator<Item = &Arc<Route>> + '_ {
        self.order.iter().map(move |i| &self.routes[*i])
    }

    /// Routes in registration order.
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Route>> {
        self.routes.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewriteConfig;
    use crate::http::X_REQUEST_ID;

    fn route(id: &str, path: &str) -> RouteConfig {
        RouteConfig {
            id: id.into(),
            path: path.into(),
            uri: "http://127.0.0.1:8000".into(),
            ..RouteConfig::default()
        }
    }

    #[test]
    fn test_longest_literal_wins() {
        let table = RouteTable::from_configs(&[
            route("catch-all", "/**"),
            route("exchange", "/currency-exchange/**"),
            route("exchange-usd", "/currency-exchange/from/USD/**"),
        ])
        .unwrap();

        assert_eq!(table.match_path("/currency-exchange/from/USD/to/INR").unwrap().id, "exchange-usd");
        assert_eq!(table.match_path("/currency-exchange/from/EUR").unwrap().id, "exchange");
        assert_eq!(table.match_path("/other").unwrap().id, "catch-all");
    }

    #[test]
    fn test_exact_beats_wildcard_and_ties_keep_order() {
        let table = RouteTable::from_configs(&[
            route("wild", "/get/**"),
            route("first", "/a/**"),
            route("exact", "/get"),
            route("second", "/a/**"),
        ])
        .unwrap();

        assert_eq!(table.match_path("/get").unwrap().id, "exact");
        assert_eq!(table.match_path("/a/x").unwrap().id, "first");
        assert!(table.match_path("/nothing").is_none());
    }

    #[test]
    fn test_invalid_route_config() {
        assert!(matches!(
            Route::from_config(&route("bad", "/a/**/b")),
            Err(RouteError::Pattern { .. })
        ));

        let mut cfg = route("bad", "/a");
        cfg.uri = "lb://".into();
        assert!(matches!(Route::from_config(&cfg), Err(RouteError::Target { .. })));

        let mut cfg = route("bad", "/a");
        cfg.add_request_headers.insert("bad header".into(), "v".into());
        assert!(matches!(Route::from_config(&cfg), Err(RouteError::Header { .. })));
    }

    #[test]
    fn test_prepare_applies_injections() {
        let mut cfg = route("conversion", "/currency-conversion-new/**");
        cfg.rewrite = Some(RewriteConfig {
            regex: "/currency-conversion-new/(?<segment>.*)".into(),
            replacement: "/currency-conversion-feign/${segment}".into(),
        });
        cfg.add_request_headers.insert("MyHeader".into(), "MyURI".into());
        cfg.set_request_headers.insert("x-env".into(), "gateway".into());
        cfg.add_request_params.insert("Param".into(), "MyValue".into());
        cfg.set_request_params.insert("mode".into(), "strict".into());
        let route = Route::from_config(&cfg).unwrap();

        let request = GatewayRequest::new(Method::GET, "/currency-conversion-new/from/USD?mode=loose&Param=mine")
            .with_header("myheader", "client")
            .with_header("x-env", "client")
            .with_header("connection", "close");
        let forward = route.prepare(&request);

        assert_eq!(forward.path, "/currency-conversion-feign/from/USD");
        let my: Vec<_> = forward.headers.get_all("myheader").iter().collect();
        assert_eq!(my, vec!["client", "MyURI"]);
        assert_eq!(forward.headers.get("x-env").unwrap(), "gateway");
        assert!(forward.headers.get("connection").is_none());
        assert_eq!(forward.headers.get(X_REQUEST_ID).unwrap().to_str().unwrap(), request.id);

        assert_eq!(
            forward.query,
            vec![
                ("Param".to_string(), "mine".to_string()),
                ("Param".to_string(), "MyValue".to_string()),
                ("mode".to_string(), "strict".to_string()),
            ]
        );
        assert_eq!(forward.raw_query, None);
    }

    #[test]
    fn test_prepare_keeps_raw_query_without_param_injection() {
        let route = Route::from_config(&route("plain", "/plain/**")).unwrap();
        let request = GatewayRequest::new(Method::GET, "/plain/x?flag&q=a%20b");
        let forward = route.prepare(&request);
        assert_eq!(forward.raw_query.as_deref(), Some("flag&q=a%20b"));
    }

    #[test]
    fn test_required_role_implies_auth() {
        let mut cfg = route("admin", "/admin/**");
        cfg.required_role = Some("admin".into());
        assert!(Route::from_config(&cfg).unwrap().require_auth);
    }
}
