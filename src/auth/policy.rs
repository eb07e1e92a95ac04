// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access policies and the authorization gate.
//!
//! ## Policy Table
//!
//! | Operation | Route | Policy |
//! |-----------|-------|--------|
//! | `Health` | `GET /health` | public |
//! | `CurrentUser` | `GET /api/v1/users/me` | authenticated |
//! | `UpdateProfile` | `PUT /api/v1/users/me` | authenticated |
//! | `ListUsers` | `GET /api/v1/users` | role `ADMIN` |
//! | `GetUser` | `GET /api/v1/users/{id}` | role `ADMIN` |
//! | `DeleteUser` | `DELETE /api/v1/users/{id}` | role `ADMIN` |
//! | `ReprovisionSubject` | `POST /api/v1/users/reprovision` | role `ADMIN` |
//!
//! Anything not listed requires authentication.

use std::collections::HashMap;

use axum::http::Method;

use super::context::AuthorizationContext;

/// Role required for administrative user management.
pub const ADMIN_ROLE: &str = "ADMIN";

static UNLISTED_POLICY: AccessPolicy = AccessPolicy::Authenticated;

/// Access rule attached to an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    /// No token needed.
    Public,
    /// Any verified subject.
    Authenticated,
    /// Verified subject holding `ROLE_<role>`.
    RoleRestricted(String),
}

impl AccessPolicy {
    pub fn role(name: impl Into<String>) -> Self {
        AccessPolicy::RoleRestricted(name.into())
    }

    /// Whether evaluating this policy needs a verified token at all.
    pub fn requires_token(&self) -> bool {
        !matches!(self, AccessPolicy::Public)
    }
}

/// Outcome of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Evaluate a policy against the (possibly absent) authorization context.
///
/// `context` is `None` when the request carried no verifiable token.
pub fn authorize(policy: &AccessPolicy, context: Option<&AuthorizationContext>) -> Decision {
    let allowed = match (policy, context) {
        (AccessPolicy::Public, _) => true,
        (_, None) => false,
        (AccessPolicy::Authenticated, Some(_)) => true,
        (AccessPolicy::RoleRestricted(role), Some(ctx)) => ctx.has_role(role),
    };
    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Protected operations exposed by the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Health,
    CurrentUser,
    UpdateProfile,
    ListUsers,
    GetUser,
    DeleteUser,
    ReprovisionSubject,
}

impl Operation {
    /// Map a method and matched route template to an operation.
    ///
    /// `HEAD` resolves like `GET` since axum serves it with the `GET` handler.
    pub fn resolve(method: &Method, route: &str) -> Option<Operation> {
        let is = |m: Method| *method == m || (m == Method::GET && *method == Method::HEAD);
        let op = match route {
            "/health" if is(Method::GET) => Operation::Health,
            "/api/v1/users/me" if is(Method::GET) => Operation::CurrentUser,
            "/api/v1/users/me" if is(Method::PUT) => Operation::UpdateProfile,
            "/api/v1/users" if is(Method::GET) => Operation::ListUsers,
            "/api/v1/users/{id}" if is(Method::GET) => Operation::GetUser,
            "/api/v1/users/{id}" if is(Method::DELETE) => Operation::DeleteUser,
            "/api/v1/users/reprovision" if is(Method::POST) => Operation::ReprovisionSubject,
            _ => return None,
        };
        Some(op)
    }
}

/// Static operation → policy table.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: HashMap<Operation, AccessPolicy>,
}

impl PolicyTable {
    pub fn empty() -> Self {
        Self {
            policies: HashMap::new(),
        }
    }

    pub fn with(mut self, operation: Operation, policy: AccessPolicy) -> Self {
        self.policies.insert(operation, policy);
        self
    }

    /// Policy for an operation; unknown operations require authentication.
    pub fn policy_for(&self, operation: Option<Operation>) -> &AccessPolicy {
        operation
            .and_then(|op| self.policies.get(&op))
            .unwrap_or(&UNLISTED_POLICY)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::empty()
            .with(Operation::Health, AccessPolicy::Public)
            .with(Operation::CurrentUser, AccessPolicy::Authenticated)
            .with(Operation::UpdateProfile, AccessPolicy::Authenticated)
            .with(Operation::ListUsers, AccessPolicy::role(ADMIN_ROLE))
            .with(Operation::GetUser, AccessPolicy::role(ADMIN_ROLE))
            .with(Operation::DeleteUser, AccessPolicy::role(ADMIN_ROLE))
            .with(Operation::ReprovisionSubject, AccessPolicy::role(ADMIN_ROLE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Authority;
    use std::collections::BTreeSet;

    fn context(roles: &[&str]) -> AuthorizationContext {
        AuthorizationContext::aggregate(
            "subject-1",
            BTreeSet::new(),
            roles.iter().map(|r| Authority::role(r)).collect(),
            BTreeSet::new(),
        )
    }

    #[test]
    fn public_allows_without_subject() {
        assert_eq!(authorize(&AccessPolicy::Public, None), Decision::Allow);
    }

    #[test]
    fn authenticated_requires_context() {
        assert_eq!(authorize(&AccessPolicy::Authenticated, None), Decision::Deny);
        assert_eq!(
            authorize(&AccessPolicy::Authenticated, Some(&context(&[]))),
            Decision::Allow
        );
    }

    #[test]
    fn role_restricted_denies_without_role() {
        let policy = AccessPolicy::role("ADMIN");
        assert_eq!(authorize(&policy, Some(&context(&["USER"]))), Decision::Deny);
        assert_eq!(authorize(&policy, None), Decision::Deny);
        assert_eq!(authorize(&policy, Some(&context(&["ADMIN"]))), Decision::Allow);
    }

    #[test]
    fn no_implicit_superuser() {
        let policy = AccessPolicy::role("AUDITOR");
        assert_eq!(
            authorize(&policy, Some(&context(&["ADMIN", "*"]))),
            Decision::Deny
        );
    }

    #[test]
    fn resolve_known_routes() {
        assert_eq!(
            Operation::resolve(&Method::GET, "/api/v1/users/{id}"),
            Some(Operation::GetUser)
        );
        assert_eq!(
            Operation::resolve(&Method::DELETE, "/api/v1/users/{id}"),
            Some(Operation::DeleteUser)
        );
        assert_eq!(Operation::resolve(&Method::PATCH, "/api/v1/users/me"), None);
    }

    #[test]
    fn head_resolves_like_get() {
        assert_eq!(
            Operation::resolve(&Method::HEAD, "/api/v1/users"),
            Some(Operation::ListUsers)
        );
        assert_eq!(
            Operation::resolve(&Method::HEAD, "/api/v1/users/{id}"),
            Some(Operation::GetUser)
        );
        assert_eq!(Operation::resolve(&Method::HEAD, "/api/v1/users/reprovision"), None);
    }

    #[test]
    fn default_table_matches_routes() {
        let table = PolicyTable::default();
        assert_eq!(table.policy_for(Some(Operation::Health)), &AccessPolicy::Public);
        assert_eq!(
            table.policy_for(Some(Operation::DeleteUser)),
            &AccessPolicy::role(ADMIN_ROLE)
        );
        assert_eq!(table.policy_for(None), &AccessPolicy::Authenticated);
    }
}
