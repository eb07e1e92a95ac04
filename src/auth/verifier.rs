// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! ## Modes
//!
//! - **Production** (`OIDC_JWKS_URL` set): signature checked against the
//!   identity provider's JWKS, expiry and (when configured) issuer enforced
//! - **Development** (no JWKS URL): structure and expiry only, no signature
//!   check. Never run this way outside a laptop.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Validation};
use serde_json::{Map, Value};

use super::claims::ClaimSet;
use super::error::AuthError;
use super::jwks::JwksManager;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Turns a raw bearer token into a verified [`ClaimSet`].
#[derive(Clone)]
pub struct TokenVerifier {
    jwks: Option<JwksManager>,
    issuer: Option<String>,
}

impl TokenVerifier {
    /// Verifier checking signatures against `jwks`.
    pub fn production(jwks: JwksManager, issuer: Option<String>) -> Self {
        Self {
            jwks: Some(jwks),
            issuer,
        }
    }

    /// Verifier that skips signature checks.
    pub fn development(issuer: Option<String>) -> Self {
        Self { jwks: None, issuer }
    }

    pub fn is_development(&self) -> bool {
        self.jwks.is_none()
    }

    pub fn jwks(&self) -> Option<&JwksManager> {
        self.jwks.as_ref()
    }

    /// Verify `token` and return its claims.
    pub async fn verify(&self, token: &str) -> Result<ClaimSet, AuthError> {
        let claims = match &self.jwks {
            Some(jwks) => self.verify_signed(token, jwks).await?,
            None => self.verify_unsigned(token)?,
        };
        Ok(ClaimSet::new(claims))
    }

    async fn verify_signed(
        &self,
        token: &str,
        jwks: &JwksManager,
    ) -> Result<Map<String, Value>, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        let (decoding_key, algorithm) = jwks.decoding_key(header.kid.as_deref()).await?;
        if header.alg != algorithm {
            return Err(AuthError::InvalidSignature);
        }

        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        // Keycloak access tokens carry `aud: account`; the client is
        // identified through `resource_access` instead.
        validation.validate_aud = false;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let data = decode::<Map<String, Value>>(token, &decoding_key, &validation)
            .map_err(|e| map_jwt_error(e.kind()))?;
        Ok(data.claims)
    }

    fn verify_unsigned(&self, token: &str) -> Result<Map<String, Value>, AuthError> {
        let data = jsonwebtoken::dangerous::insecure_decode::<Map<String, Value>>(token)
            .map_err(|_| AuthError::MalformedToken)?;
        let claims = data.claims;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .as_secs() as i64;
        let leeway = CLOCK_SKEW_LEEWAY as i64;

        if let Some(exp) = claims.get("exp").and_then(Value::as_i64) {
            if exp < now - leeway {
                return Err(AuthError::TokenExpired);
            }
        }
        if let Some(nbf) = claims.get("nbf").and_then(Value::as_i64) {
            if nbf > now + leeway {
                return Err(AuthError::TokenNotYetValid);
            }
        }
        if let Some(expected) = &self.issuer {
            if claims.get("iss").and_then(Value::as_str) != Some(expected.as_str()) {
                return Err(AuthError::InvalidIssuer);
            }
        }
        Ok(claims)
    }
}

fn map_jwt_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        _ => AuthError::MalformedToken,
    }
}

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}
