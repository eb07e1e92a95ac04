// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! OIDC bearer-token authentication and role-based authorization.
//!
//! ## Auth Flow
//!
//! 1. The caller signs in at the identity provider (Keycloak realm)
//! 2. The caller sends `Authorization: Bearer <access token>`
//! 3. The gate middleware:
//!    - Resolves the route's access policy (public routes stop here)
//!    - Verifies the token against the realm JWKS
//!    - Derives authorities:
//!      - `scope` / `scp` → `SCOPE_<scope>`
//!      - `realm_access.roles` → `ROLE_<role>`
//!      - `resource_access.<client>.roles` → `ROLE_<role>`
//!    - Allows or denies the operation
//!
//! ## Security
//!
//! - Unlisted routes require authentication
//! - Role checks are exact, there is no superuser wildcard
//! - JWKS is fetched over HTTPS and cached
//! - Clock skew tolerance is 60 seconds

pub mod authority;
pub mod claims;
pub mod context;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod policy;
pub mod roles;
pub mod verifier;

pub use authority::Authority;
pub use claims::{ClaimSet, Principal, ProfileClaims, RoleList};
pub use context::AuthorizationContext;
pub use error::AuthError;
pub use extractor::Auth;
pub use jwks::JwksManager;
pub use middleware::authorization_gate;
pub use policy::{authorize, AccessPolicy, Decision, Operation, PolicyTable, ADMIN_ROLE};
pub use roles::{RoleExtractor, DEFAULT_TARGET_AUDIENCE};
pub use verifier::TokenVerifier;
