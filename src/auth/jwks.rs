// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Security
//!
//! - JWKS is fetched via HTTPS only (enforced by [`crate::config`])
//! - Keys are cached for five minutes
//! - An unknown `kid` forces one refetch so realm key rotation is picked
//!   up before the cache expires

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;

use super::error::AuthError;

/// Default JWKS cache TTL (5 minutes).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// HTTP timeout for the JWKS endpoint.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// Cached view of the identity provider's signing keys.
#[derive(Clone)]
pub struct JwksManager {
    jwks_url: String,
    cache_ttl: Duration,
    cache: Arc<RwLock<Option<CacheEntry>>>,
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a manager for e.g.
    /// `https://sso.example.com/realms/main/protocol/openid-connect/certs`.
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| AuthError::InternalError(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            client,
        })
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    async fn cached(&self) -> Option<JwkSet> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
            .map(|entry| entry.jwks.clone())
    }

    async fn get_jwks(&self) -> Result<JwkSet, AuthError> {
        match self.cached().await {
            Some(jwks) => Ok(jwks),
            None => self.refresh().await,
        }
    }

    /// Fetch the key set and replace the cache.
    pub async fn refresh(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetchError(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        tracing::debug!(keys = jwks.keys.len(), "JWKS refreshed");
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
        });
        Ok(jwks)
    }

    /// Decoding key for `kid`, or the first usable key when the token has none.
    pub async fn decoding_key(
        &self,
        kid: Option<&str>,
    ) -> Result<(DecodingKey, Algorithm), AuthError> {
        let jwks = self.get_jwks().await?;
        if let Some(found) = select_key(&jwks, kid) {
            return found;
        }
        // Unknown kid: the realm may have rotated keys since the last fetch.
        let jwks = self.refresh().await?;
        select_key(&jwks, kid).unwrap_or(Err(AuthError::NoMatchingKey))
    }

    /// Whether a fresh key set is cached.
    pub async fn is_cached(&self) -> bool {
        self.cached().await.is_some()
    }
}

fn select_key(
    jwks: &JwkSet,
    kid: Option<&str>,
) -> Option<Result<(DecodingKey, Algorithm), AuthError>> {
    match kid {
        Some(kid) => jwks
            .keys
            .iter()
            .find(|k| k.common.key_id.as_deref() == Some(kid))
            .map(jwk_to_decoding_key),
        None => jwks.keys.iter().map(jwk_to_decoding_key).find(Result::is_ok),
    }
}

fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    let algorithm = match &jwk.common.key_algorithm {
        Some(KeyAlgorithm::RS384) => Algorithm::RS384,
        Some(KeyAlgorithm::RS512) => Algorithm::RS512,
        Some(KeyAlgorithm::PS256) => Algorithm::PS256,
        Some(KeyAlgorithm::PS384) => Algorithm::PS384,
        Some(KeyAlgorithm::PS512) => Algorithm::PS512,
        Some(KeyAlgorithm::ES256) => Algorithm::ES256,
        Some(KeyAlgorithm::ES384) => Algorithm::ES384,
        Some(KeyAlgorithm::EdDSA) => Algorithm::EdDSA,
        Some(KeyAlgorithm::RS256) => Algorithm::RS256,
        None => default_algorithm(jwk)?,
        Some(other) => {
            return Err(AuthError::InternalError(format!(
                "unsupported JWKS key algorithm {other:?}"
            )))
        }
    };
    let key = DecodingKey::from_jwk(jwk)
        .map_err(|e| AuthError::InternalError(format!("invalid JWK: {e}")))?;
    Ok((key, algorithm))
}

/// Algorithm implied by the key type when the JWK omits `alg`.
fn default_algorithm(jwk: &Jwk) -> Result<Algorithm, AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Ok(Algorithm::RS256),
        AlgorithmParameters::EllipticCurve(ec) if matches!(ec.curve, EllipticCurve::P384) => {
            Ok(Algorithm::ES384)
        }
        AlgorithmParameters::EllipticCurve(_) => Ok(Algorithm::ES256),
        AlgorithmParameters::OctetKeyPair(_) => Ok(Algorithm::EdDSA),
        _ => Err(AuthError::InternalError(
            "symmetric JWKS keys are not accepted".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSA_JWKS: &str = r#"{
        "keys": [{
            "kty": "RSA",
            "kid": "realm-key-1",
            "use": "sig",
            "alg": "RS256",
            "n": "u1SU1LfVLPHCozMxH2Mo4lgOEePzNm0tRgeLezV6ffAt0gunVTLw7onLRnrq0_IzW7yWR7QkrmBL7jTKEn5u-qKhbwKfBstIs-bMY2Zkp18gnTxKLxoS2tFczGkPLPgizskuemMghRniWaoLcyehkd3qqGElvW_VDL5AaWTg0nLVkjRo9z-40RQzuVaE8AkAFmxZzow3x-VJYKdjykkJ0iT9wCS0DRTXu269V264Vf_3jvredZiKRkgwlL9xNAwxXFg0x_XFw005UWVRIkdgcKWTjpBP2dPwVZ4WWC-9aGVd-Gyn1o0CLelf4rEjGoXbAAEgAqeGUxrcIlbjXfbcmw",
            "e": "AQAB"
        }]
    }"#;

    const EC_JWKS_WITHOUT_ALG: &str = r#"{
        "keys": [{
            "kty": "EC",
            "kid": "realm-ec-1",
            "crv": "P-256",
            "x": "MKBCTNIcKUSDii11ySs3526iDZ8AiTo7Tu6KPAqv7D4",
            "y": "4Etl6SRW2YiLUrN5vfvVHuhp7x8PxltmWWlbbM4IFyM"
        }]
    }"#;

    fn jwks() -> JwkSet {
        serde_json::from_str(RSA_JWKS).unwrap()
    }

    #[test]
    fn manager_keeps_url_and_ttl() {
        let manager = JwksManager::new("https://sso.example.com/certs")
            .unwrap()
            .with_cache_ttl(Duration::from_secs(60));
        assert_eq!(manager.jwks_url(), "https://sso.example.com/certs");
        assert_eq!(manager.cache_ttl, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn cache_initially_empty() {
        let manager = JwksManager::new("https://sso.example.com/certs").unwrap();
        assert!(!manager.is_cached().await);
    }

    #[test]
    fn selects_key_by_kid() {
        let jwks = jwks();
        let (_, alg) = select_key(&jwks, Some("realm-key-1")).unwrap().unwrap();
        assert_eq!(alg, Algorithm::RS256);
        assert!(select_key(&jwks, Some("rotated-away")).is_none());
    }

    #[test]
    fn falls_back_to_first_usable_key_without_kid() {
        let jwks = jwks();
        assert!(matches!(select_key(&jwks, None), Some(Ok(_))));
    }

    #[test]
    fn missing_alg_follows_key_type() {
        let jwks: JwkSet = serde_json::from_str(EC_JWKS_WITHOUT_ALG).unwrap();
        let (_, alg) = select_key(&jwks, Some("realm-ec-1")).unwrap().unwrap();
        assert_eq!(alg, Algorithm::ES256);

        let mut rsa = self::jwks();
        rsa.keys[0].common.key_algorithm = None;
        let (_, alg) = select_key(&rsa, None).unwrap().unwrap();
        assert_eq!(alg, Algorithm::RS256);
    }
}
