// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization gate middleware.
//!
//! Runs as a `route_layer`, so the matched route template is known:
//!
//! 1. Resolve the [`Operation`] from method + matched path
//! 2. Public operations pass straight through, no token is read
//! 3. Otherwise verify the bearer token (401 on failure)
//! 4. Build the authorization context and evaluate the policy (403 on deny)
//! 5. Store the [`Principal`] in request extensions for the handler

use axum::{
    extract::{MatchedPath, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::claims::Principal;
use super::error::AuthError;
use super::policy::{authorize, Operation};
use super::verifier::bearer_token;
use crate::state::AppState;

pub async fn authorization_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let operation = Operation::resolve(request.method(), &route);
    let policy = state.policies.policy_for(operation);

    if !policy.requires_token() {
        return next.run(request).await;
    }

    let principal = match authenticate(&state, request.headers()).await {
        Ok(principal) => principal,
        Err(e) => {
            tracing::debug!(route = %route, reason = e.reason(), "Request not authenticated");
            return e.into_response();
        }
    };

    if !authorize(policy, Some(&principal.context)).is_allowed() {
        tracing::warn!(
            subject = %principal.subject(),
            route = %route,
            operation = ?operation,
            "Authorization denied"
        );
        return AuthError::InsufficientPermissions.into_response();
    }

    request.extensions_mut().insert(principal);
    next.run(request).await
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Principal, AuthError> {
    let token = bearer_token(headers)?;
    let claims = state.verifier.verify(token).await?;
    let context = state
        .extractor
        .context_for(&claims)
        .ok_or(AuthError::MissingSubject)?;
    Ok(Principal {
        context,
        profile: claims.profile(),
    })
}
