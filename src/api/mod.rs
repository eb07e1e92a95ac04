// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::authorization_gate,
    error::{attach_error_path, ErrorBody},
    identity::{IdentityResponse, ProfilePatch},
    state::AppState,
};

pub mod admin;
pub mod health;
pub mod users;

/// Build the application router.
///
/// Every API route sits behind the authorization gate; the Swagger UI
/// at `/docs` does not.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/v1/users/me",
            get(users::get_current_user).put(users::update_current_user),
        )
        .route("/api/v1/users", get(admin::list_users))
        .route("/api/v1/users/reprovision", post(admin::reprovision_subject))
        .route(
            "/api/v1/users/{id}",
            get(admin::get_user).delete(admin::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authorization_gate,
        ))
        .with_state(state);

    Router::new()
        .merge(api)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(attach_error_path)),
        )
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        users::get_current_user,
        users::update_current_user,
        admin::list_users,
        admin::get_user,
        admin::delete_user,
        admin::reprovision_subject
    ),
    components(
        schemas(
            IdentityResponse,
            ProfilePatch,
            ErrorBody,
            admin::ReprovisionRequest,
            health::HealthResponse,
            health::HealthChecks
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness and dependency status"),
        (name = "Users", description = "Caller's own identity"),
        (name = "Admin", description = "User management (ADMIN role)")
    )
)]
pub struct ApiDoc;
