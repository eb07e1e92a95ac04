// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Boundary error mapping.
//!
//! Every failed request answers with the same JSON shape:
//!
//! ```json
//! {
//!   "timestamp": "2026-01-31T12:00:00",
//!   "code": "NOT_FOUND",
//!   "message": "User not found",
//!   "path": "/api/v1/users/0b1c..."
//! }
//! ```
//!
//! Handlers do not know the request path, so [`ApiError`] renders an empty
//! `path` and parks a copy of the body in the response extensions.
//! [`attach_error_path`] fills it in on the way out.

use axum::{
    extract::Request,
    http::{header::CONTENT_LENGTH, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::identity::IdentityError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

/// Structured error body returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorBody {
    /// UTC time of the failure, second precision.
    pub timestamp: String,
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Request path that failed.
    pub path: String,
}

impl ErrorBody {
    fn at(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    fn body(&self) -> ErrorBody {
        ErrorBody {
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            code: self.code.to_string(),
            message: self.message.clone(),
            path: String::new(),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Validation(msg) => ApiError::validation(msg),
            IdentityError::NotFound(msg) => ApiError::not_found(msg),
            IdentityError::Conflict(msg) => ApiError::conflict(msg),
            IdentityError::Deprovisioned(_) => ApiError::new(
                StatusCode::FORBIDDEN,
                "IDENTITY_DEPROVISIONED",
                "This account has been removed; contact an administrator",
            ),
            IdentityError::Storage(e) => {
                tracing::error!(error = %e, "identity storage failure");
                ApiError::internal("Internal storage error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.body();
        let mut response = (self.status, Json(body.clone())).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

/// Middleware stamping the request path into error bodies.
pub async fn attach_error_path(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    let Some(body) = response.extensions().get::<ErrorBody>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    (parts, Json(body.at(path))).into_response()
}
