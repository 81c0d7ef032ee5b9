//! Request handling and transformation.
//!
//! # Responsibilities
//! - Carry the inbound request through filters, routing and policies
//! - Keep the request ID assigned at the edge (or by the client)
//! - Hold per-request typed state (auth context, log timestamps) in extensions
//!
//! # Design Decisions
//! - Body is buffered once so every retry attempt can resend it
//! - Query parameters kept as an ordered list; duplicate names are legal
//! - The raw query string is kept so an untouched query is forwarded verbatim
//! - Dot segments (`.`, `..`, and their percent-encoded forms) are resolved
//!   once at construction, so routing, auth and the downstream URL all see
//!   the same path

use axum::body::Bytes;
use axum::http::{request::Parts, Extensions, HeaderMap, HeaderName, HeaderValue, Method};
use uuid::Uuid;

/// Header carrying the correlation ID across the gateway and downstream.
pub const X_REQUEST_ID: &str = "x-request-id";

/// An inbound request as seen by the gateway pipeline.
#[derive(Debug)]
pub struct GatewayRequest {
    /// Correlation ID (taken from `x-request-id` or freshly generated).
    pub id: String,
    pub method: Method,
    /// Path without query string.
    pub path: String,
    /// Ordered query parameters.
    pub query: Vec<(String, String)>,
    /// Query string as received, without the `?`.
    pub raw_query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Typed per-request state attached by filters.
    pub extensions: Extensions,
}

impl GatewayRequest {
    /// Build a request from a method and a `path?query` string.
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let (path, raw_query, query) = split_path_and_query(path_and_query);
        Self {
            id: Uuid::new_v4().to_string(),
            method,
            path,
            query,
            raw_query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            extensions: Extensions::new(),
        }
    }

    /// Build a request from decomposed HTTP parts and a buffered body.
    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let (path, raw_query, query) = split_path_and_query(path_and_query);

        let id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            id,
            method: parts.method,
            path,
            query,
            raw_query,
            headers: parts.headers,
            body,
            extensions: parts.extensions,
        }
    }

    /// Builder-style header insertion. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The received query string, if `query` still holds exactly what it
    /// parses to. Filters that edit `query` make this `None`.
    pub fn unmodified_raw_query(&self) -> Option<&str> {
        let raw = self.raw_query.as_deref()?;
        let parsed: Vec<(String, String)> = url::form_urlencoded::parse(raw.as_bytes())
            .into_owned()
            .collect();
        (parsed == self.query).then_some(raw)
    }

    /// First value of a query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

fn split_path_and_query(
    path_and_query: &str,
) -> (String, Option<String>, Vec<(String, String)>) {
    match path_and_query.split_once('?') {
        Some((path, query)) => (
            normalize_path(path),
            Some(query.to_string()),
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        ),
        None => (normalize_path(path_and_query), None, Vec::new()),
    }
}

fn is_single_dot(segment: &str) -> bool {
    segment == "." || segment.eq_ignore_ascii_case("%2e")
}

fn is_double_dot(segment: &str) -> bool {
    matches!(
        segment.to_ascii_lowercase().as_str(),
        ".." | ".%2e" | "%2e." | "%2e%2e"
    )
}

/// Absolute path with dot segments resolved the way a URL parser resolves
/// them. Backslashes count as separators, as they do for `http` URLs.
pub(crate) fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let relative = path.strip_prefix('/').unwrap_or(&path);

    let mut segments: Vec<&str> = Vec::new();
    let mut trailing_slash = false;
    for segment in relative.split('/') {
        trailing_slash = false;
        if is_single_dot(segment) {
            trailing_slash = true;
        } else if is_double_dot(segment) {
            segments.pop();
            trailing_slash = true;
        } else {
            segments.push(segment);
        }
    }
    if trailing_slash {
        segments.push("");
    }

    format!("/{}", segments.join("/"))
}
