// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the authenticated caller.
//!
//! The gate middleware has already verified the token and evaluated the
//! route's policy; handlers only pick up the result:
//!
//! ```rust,ignore
//! async fn me(Auth(principal): Auth) -> impl IntoResponse {
//!     // principal.subject(), principal.profile.email, ...
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::claims::Principal;
use super::error::AuthError;

/// The verified caller of the current request.
///
/// Rejects with 401 when the route was not behind the gate.
pub struct Auth(pub Principal);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::MissingAuthHeader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthorizationContext, ProfileClaims};
    use axum::http::Request;
    use std::collections::BTreeSet;

    fn parts() -> Parts {
        Request::builder().uri("/test").body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn rejects_without_principal() {
        let mut parts = parts();
        let result = Auth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn reads_principal_from_extensions() {
        let mut parts = parts();
        parts.extensions.insert(Principal {
            context: AuthorizationContext::aggregate(
                "kc-1",
                BTreeSet::new(),
                BTreeSet::new(),
                BTreeSet::new(),
            ),
            profile: ProfileClaims::default(),
        });

        let Auth(principal) = Auth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(principal.subject(), "kc-1");
    }
}
