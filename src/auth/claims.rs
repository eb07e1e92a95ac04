// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified token claims and their typed views.
//!
//! The identity provider (Keycloak-style) places roles in two nested claims:
//!
//! ```json
//! {
//!   "sub": "8f7c...",
//!   "realm_access": { "roles": ["USER", "ADMIN"] },
//!   "resource_access": {
//!     "api-gateway": { "roles": ["reporting"] }
//!   }
//! }
//! ```
//!
//! Claim shapes are not trusted. Every accessor here is a total function:
//! a missing claim, a non-object where an object is expected or a
//! non-list `roles` field all decode to `None`, never to an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::context::AuthorizationContext;

/// Claim holding realm-wide roles.
pub const REALM_ACCESS_CLAIM: &str = "realm_access";

/// Claim holding per-client roles, keyed by client id.
pub const RESOURCE_ACCESS_CLAIM: &str = "resource_access";

/// Field carrying the role list inside both access claims.
const ROLES_FIELD: &str = "roles";

/// The full claim set of one verified token. Read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Raw claim lookup.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A claim that must be a string; other shapes count as absent.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// The `sub` claim, if present and non-blank.
    pub fn subject(&self) -> Option<&str> {
        self.string("sub").filter(|s| !s.trim().is_empty())
    }

    /// Roles from `realm_access.roles`.
    pub fn realm_roles(&self) -> Option<RoleList> {
        self.get(REALM_ACCESS_CLAIM)
            .and_then(Value::as_object)
            .and_then(|section| section.get(ROLES_FIELD))
            .and_then(RoleList::decode)
    }

    /// Roles from `resource_access.<audience>.roles`.
    pub fn client_roles(&self, audience: &str) -> Option<RoleList> {
        self.get(RESOURCE_ACCESS_CLAIM)
            .and_then(Value::as_object)
            .and_then(|clients| clients.get(audience))
            .and_then(Value::as_object)
            .and_then(|section| section.get(ROLES_FIELD))
            .and_then(RoleList::decode)
    }

    /// Granted OAuth scopes.
    ///
    /// Reads `scope` (space-delimited string), falling back to `scp`
    /// (string or list).
    pub fn scopes(&self) -> Vec<String> {
        let raw = self.get("scope").or_else(|| self.get("scp"));
        match raw {
            Some(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
            Some(Value::Array(_)) => raw
                .and_then(RoleList::decode)
                .map(RoleList::into_inner)
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Profile claims used to seed a new identity.
    pub fn profile(&self) -> ProfileClaims {
        ProfileClaims {
            email: self.non_blank("email"),
            name: self.non_blank("name"),
            preferred_username: self.non_blank("preferred_username"),
        }
    }

    fn non_blank(&self, name: &str) -> Option<String> {
        self.string(name)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

impl From<Map<String, Value>> for ClaimSet {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

/// A decoded `roles` list.
///
/// Only produced from a JSON array; non-string entries are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleList(Vec<String>);

impl RoleList {
    /// Decode a JSON value into a role list. `None` unless it is an array.
    pub fn decode(value: &Value) -> Option<Self> {
        let items = value.as_array()?;
        Some(Self(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

/// Profile attributes asserted by the token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileClaims {
    pub email: Option<String>,
    pub name: Option<String>,
    pub preferred_username: Option<String>,
}

/// The caller of one request after successful verification.
///
/// Inserted into request extensions by the gate middleware and handed to
/// handlers through the [`Auth`](super::Auth) extractor.
#[derive(Debug, Clone)]
pub struct Principal {
    pub context: AuthorizationContext,
    pub profile: ProfileClaims,
}

impl Principal {
    pub fn subject(&self) -> &str {
        self.context.subject()
    }
}
