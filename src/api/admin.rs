// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only user management.
//!
//! Every route here is `ROLE_RESTRICTED(ADMIN)` in the policy table; the
//! gate has already rejected other callers before a handler runs.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::Auth,
    error::{ApiError, ErrorBody},
    identity::{IdentityResponse, Page, PageRequest},
    state::AppState,
};

/// Body of `POST /api/v1/users/reprovision`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReprovisionRequest {
    /// Identity-provider subject to let back in.
    pub subject_id: String,
}

fn user_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::validation("id: must be a UUID"))
}

/// List users, one page at a time.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(PageRequest),
    responses(
        (status = 200, description = "One page of users", body = Page<IdentityResponse>),
        (status = 400, description = "Invalid paging parameters", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Caller is not an administrator", body = ErrorBody),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Json<Page<IdentityResponse>>, ApiError> {
    let Query(request) = query.map_err(|e| ApiError::validation(e.body_text()))?;
    Ok(Json(state.identities.find_all(&request)?))
}

/// Get one user by internal id.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Internal user id")),
    responses(
        (status = 200, description = "The user", body = IdentityResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let id = user_id(path)?;
    Ok(Json(state.identities.find_by_id(id)?))
}

/// Permanently delete a user. The subject cannot sign in again until
/// reprovisioned.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Internal user id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Caller is not an administrator", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Auth(admin): Auth,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = user_id(path)?;
    state.identities.delete_by_id(id)?;
    tracing::info!(admin = %admin.subject(), identity_id = %id, "Admin deleted user");
    Ok(StatusCode::NO_CONTENT)
}

/// Clear a deleted subject's tombstone so its next login creates a fresh
/// identity.
#[utoipa::path(
    post,
    path = "/api/v1/users/reprovision",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = ReprovisionRequest,
    responses(
        (status = 204, description = "Subject may sign in again"),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 403, description = "Caller is not an administrator", body = ErrorBody),
        (status = 404, description = "Subject is not deprovisioned", body = ErrorBody),
    )
)]
pub async fn reprovision_subject(
    State(state): State<AppState>,
    Auth(admin): Auth,
    body: Result<Json<ReprovisionRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::validation(e.body_text()))?;
    let subject = request.subject_id.trim();
    if subject.is_empty() {
        return Err(ApiError::validation("subjectId: must not be blank"));
    }
    state.identities.reprovision(subject)?;
    tracing::info!(admin = %admin.subject(), subject = %subject, "Admin reprovisioned subject");
    Ok(StatusCode::NO_CONTENT)
}
