//! Bearer credentials and their validation.
//!
//! # Responsibilities
//! - Extract a bearer token from the `Authorization` header
//! - Verify it through a pluggable [`CredentialValidator`]
//! - Derive the per-request [`AuthContext`]

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use thiserror::Error;

use crate::config::AuthConfig;

/// Claims carried by a verified credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub principal: String,
    pub role: Option<String>,
    /// Unix seconds.
    pub expires_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidToken {
    #[error("unknown credential")]
    Unknown,

    #[error("credential rejected: {0}")]
    Rejected(String),
}

/// Why a request carries no usable bearer credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("missing Authorization header")]
    Missing,

    #[error("malformed Authorization header")]
    Malformed,
}

/// Verifies bearer tokens.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, InvalidToken>;
}

/// Identity of the caller, attached to the request once verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub principal: String,
    pub role: Option<String>,
    pub expiry: Option<SystemTime>,
}

impl AuthContext {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            principal: claims.principal,
            role: claims.role,
            // Expiries past the representable range never expire.
            expiry: claims
                .expires_at
                .and_then(|secs| UNIX_EPOCH.checked_add(Duration::from_secs(secs))),
        }
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expiry.map(|at| at <= now).unwrap_or(false)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, CredentialError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(CredentialError::Missing)?
        .to_str()
        .map_err(|_| CredentialError::Malformed)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(CredentialError::Malformed)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() || token.contains(' ') {
        return Err(CredentialError::Malformed);
    }
    Ok(token)
}

/// Validator backed by the `[auth]` credential table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, Claims>,
}

impl StaticTokenValidator {
    pub fn from_config(config: &AuthConfig) -> Self {
        let tokens = config
            .credentials
            .iter()
            .map(|c| {
                (
                    c.token.clone(),
                    Claims {
                        principal: c.principal.clone(),
                        role: c.role.clone(),
                        expires_at: c.expires_at,
                    },
                )
            })
            .collect();
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl CredentialValidator for StaticTokenValidator {
    async fn verify(&self, token: &str) -> Result<Claims, InvalidToken> {
        self.tokens.get(token).cloned().ok_or(InvalidToken::Unknown)
    }
}
