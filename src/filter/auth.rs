//! Bearer authentication filter.
//!
//! Protected paths require `Authorization: Bearer <token>`:
//! - missing or malformed header → 401
//! - token rejected by the validator, or expired → 401
//! - role does not match the route's required role → 403
//!
//! Which paths are protected is decided by a [`ProtectionTable`] built from
//! the routes once, using the same specificity rules as the route table.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use axum::http::{header, HeaderValue};

use crate::error::GatewayError;
use crate::filter::{FilterAction, GatewayFilter};
use crate::http::{GatewayRequest, GatewayResponse};
use crate::routing::{PathPattern, RouteTable};
use crate::security::{bearer_token, AuthContext, CredentialValidator};

/// What a protected path demands of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequirement {
    pub role: Option<String>,
}

/// Path patterns and their requirements, in route match order.
#[derive(Debug, Clone, Default)]
pub struct ProtectionTable {
    rules: Vec<(PathPattern, Option<AccessRequirement>)>,
}

impl ProtectionTable {
    pub fn from_routes(routes: &RouteTable) -> Self {
        let rules = routes
            .in_match_order()
            .map(|route| {
                let requirement = route.require_auth.then(|| AccessRequirement {
                    role: route.required_role.clone(),
                });
                (route.pattern.clone(), requirement)
            })
            .collect();
        Self { rules }
    }

    /// Requirement of the route that would serve `path`, if it is protected.
    pub fn requirement_for(&self, path: &str) -> Option<&AccessRequirement> {
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .and_then(|(_, requirement)| requirement.as_ref())
    }

    pub fn protected_count(&self) -> usize {
        self.rules.iter().filter(|(_, r)| r.is_some()).count()
    }
}

pub struct AuthFilter {
    order: i32,
    validator: Arc<dyn CredentialValidator>,
    table: ProtectionTable,
}

impl AuthFilter {
    pub fn new(order: i32, validator: Arc<dyn CredentialValidator>, table: ProtectionTable) -> Self {
        Self {
            order,
            validator,
            table,
        }
    }

    fn reject(request: &GatewayRequest, err: GatewayError) -> FilterAction {
        tracing::warn!(request_id = %request.id, path = %request.path, reason = %err, "Rejected request");
        let mut response = GatewayResponse::from_error(&err);
        if matches!(err, GatewayError::AuthRequired(_)) {
            response
                .headers
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        FilterAction::Respond(response)
    }
}

#[async_trait]
impl GatewayFilter for AuthFilter {
    fn name(&self) -> &str {
        "auth"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn short_circuit(&self) -> bool {
        true
    }

    async fn on_request(&self, request: &mut GatewayRequest) -> FilterAction {
        let Some(requirement) = self.table.requirement_for(&request.path) else {
            return FilterAction::Continue;
        };

        let token = match bearer_token(&request.headers) {
            Ok(token) => token.to_string(),
            Err(e) => return Self::reject(request, GatewayError::AuthRequired(e.to_string())),
        };

        let context = match self.validator.verify(&token).await {
            Ok(claims) => AuthContext::from_claims(claims),
            Err(e) => return Self::reject(request, GatewayError::AuthRequired(e.to_string())),
        };

        if context.is_expired(SystemTime::now()) {
            return Self::reject(request, GatewayError::AuthRequired("credential expired".into()));
        }

        if let Some(role) = &requirement.role {
            if !context.has_role(role) {
                return Self::reject(
                    request,
                    GatewayError::AuthForbidden(format!("role '{}' required", role)),
                );
            }
        }

        tracing::debug!(request_id = %request.id, principal = %context.principal, "Request authenticated");
        request.extensions.insert(context);
        FilterAction::Continue
    }
}
