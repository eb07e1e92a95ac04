// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Self-service endpoints for the authenticated caller.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    auth::Auth,
    error::{ApiError, ErrorBody},
    identity::{FirstContact, IdentityResponse, ProfilePatch},
    state::AppState,
};

/// Set to `true` while the caller still has to complete their profile.
pub static PROFILE_INCOMPLETE_HEADER: HeaderName = HeaderName::from_static("x-profile-incomplete");

/// Get (or create on first login) the caller's identity.
///
/// Identity attributes are taken from the token only on first contact.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's identity", body = IdentityResponse,
            headers(("x-profile-incomplete" = bool, description = "Present while the profile is incomplete"))),
        (status = 400, description = "Token carries no email", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Subject was deprovisioned", body = ErrorBody),
        (status = 409, description = "Email belongs to another identity", body = ErrorBody),
    )
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    Auth(principal): Auth,
) -> Result<Response, ApiError> {
    let profile = &principal.profile;
    let identity = state.identities.get_or_create(
        principal.subject(),
        FirstContact {
            email: profile.email.as_deref(),
            display_name: profile.name.as_deref(),
            preferred_handle: profile.preferred_username.as_deref(),
        },
    )?;

    let incomplete = !identity.profile_completed;
    let mut response = Json(IdentityResponse::from(identity)).into_response();
    if incomplete {
        response.headers_mut().insert(
            PROFILE_INCOMPLETE_HEADER.clone(),
            HeaderValue::from_static("true"),
        );
    }
    Ok(response)
}

/// Update the caller's profile and mark it complete.
///
/// Absent or blank fields keep their stored value.
#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = ProfilePatch,
    responses(
        (status = 200, description = "Updated identity", body = IdentityResponse),
        (status = 400, description = "Invalid profile data", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "No identity for the caller yet", body = ErrorBody),
        (status = 409, description = "Email belongs to another identity", body = ErrorBody),
    )
)]
pub async fn update_current_user(
    State(state): State<AppState>,
    Auth(principal): Auth,
    body: Result<Json<ProfilePatch>, JsonRejection>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let Json(patch) = body.map_err(|e| ApiError::validation(e.body_text()))?;
    let updated = state
        .identities
        .update_profile(principal.subject(), &patch)?;
    Ok(Json(updated))
}
