// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role extraction from verified claims.

use std::collections::BTreeSet;

use super::authority::Authority;
use super::claims::{ClaimSet, RoleList};
use super::context::AuthorizationContext;

/// Client id this service is registered under at the identity provider.
pub const DEFAULT_TARGET_AUDIENCE: &str = "api-gateway";

/// Turns realm and client role claims into authorities.
///
/// The audience whose client roles are honoured is fixed at construction;
/// roles granted to other clients in the same token are ignored.
#[derive(Debug, Clone)]
pub struct RoleExtractor {
    target_audience: String,
}

impl RoleExtractor {
    pub fn new(target_audience: impl Into<String>) -> Self {
        Self {
            target_audience: target_audience.into(),
        }
    }

    pub fn target_audience(&self) -> &str {
        &self.target_audience
    }

    /// Realm and client authorities combined.
    pub fn extract_authorities(&self, claims: &ClaimSet) -> BTreeSet<Authority> {
        let mut authorities = self.realm_authorities(claims);
        authorities.extend(self.client_authorities(claims));
        authorities
    }

    /// `ROLE_*` authorities from `realm_access.roles`.
    pub fn realm_authorities(&self, claims: &ClaimSet) -> BTreeSet<Authority> {
        to_authorities(claims.realm_roles())
    }

    /// `ROLE_*` authorities from `resource_access.<target_audience>.roles`.
    pub fn client_authorities(&self, claims: &ClaimSet) -> BTreeSet<Authority> {
        to_authorities(claims.client_roles(&self.target_audience))
    }

    /// `SCOPE_*` authorities every token carries by default.
    pub fn default_authorities(&self, claims: &ClaimSet) -> BTreeSet<Authority> {
        claims
            .scopes()
            .iter()
            .map(|scope| Authority::scope(scope))
            .collect()
    }

    /// Build the authorization context for a verified token.
    ///
    /// Returns `None` when the token carries no usable subject.
    pub fn context_for(&self, claims: &ClaimSet) -> Option<AuthorizationContext> {
        let subject = claims.subject()?;
        Some(AuthorizationContext::aggregate(
            subject,
            self.default_authorities(claims),
            self.realm_authorities(claims),
            self.client_authorities(claims),
        ))
    }
}

impl Default for RoleExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_AUDIENCE)
    }
}

fn to_authorities(roles: Option<RoleList>) -> BTreeSet<Authority> {
    roles
        .map(|list| list.iter().map(Authority::role).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn claims(value: Value) -> ClaimSet {
        match value {
            Value::Object(map) => ClaimSet::new(map),
            other => panic!("test claims must be an object, got {other}"),
        }
    }

    fn names(set: &BTreeSet<Authority>) -> Vec<&str> {
        set.iter().map(Authority::as_str).collect()
    }

    #[test]
    fn extracts_realm_and_client_roles() {
        let extractor = RoleExtractor::new("api-gateway");
        let set = claims(json!({
            "realm_access": { "roles": ["USER"] },
            "resource_access": { "api-gateway": { "roles": ["ADMIN"] } }
        }));
        let authorities = extractor.extract_authorities(&set);
        assert_eq!(names(&authorities), vec!["ROLE_ADMIN", "ROLE_USER"]);
    }

    #[test]
    fn missing_realm_claim_contributes_nothing() {
        let extractor = RoleExtractor::default();
        let set = claims(json!({ "sub": "s-1" }));
        assert!(extractor.realm_authorities(&set).is_empty());
        assert!(extractor.client_authorities(&set).is_empty());
    }

    #[test]
    fn non_list_client_roles_contribute_nothing() {
        let extractor = RoleExtractor::new("api-gateway");
        let set = claims(json!({
            "realm_access": { "roles": ["USER"] },
            "resource_access": { "api-gateway": { "roles": "ADMIN" } }
        }));
        assert!(extractor.client_authorities(&set).is_empty());
        assert_eq!(names(&extractor.extract_authorities(&set)), vec!["ROLE_USER"]);
    }

    #[test]
    fn other_audiences_are_ignored() {
        let extractor = RoleExtractor::new("user-service");
        let set = claims(json!({
            "resource_access": { "api-gateway": { "roles": ["ADMIN"] } }
        }));
        assert!(extractor.extract_authorities(&set).is_empty());
    }

    #[test]
    fn duplicate_roles_collapse() {
        let extractor = RoleExtractor::new("api-gateway");
        let set = claims(json!({
            "realm_access": { "roles": ["ADMIN", "ADMIN"] },
            "resource_access": { "api-gateway": { "roles": ["ADMIN"] } }
        }));
        assert_eq!(names(&extractor.extract_authorities(&set)), vec!["ROLE_ADMIN"]);
    }

    #[test]
    fn default_authorities_come_from_scopes() {
        let extractor = RoleExtractor::default();
        let set = claims(json!({ "scope": "openid email" }));
        assert_eq!(
            names(&extractor.default_authorities(&set)),
            vec!["SCOPE_email", "SCOPE_openid"]
        );
    }

    #[test]
    fn context_requires_subject() {
        let extractor = RoleExtractor::default();
        let set = claims(json!({ "realm_access": { "roles": ["ADMIN"] } }));
        assert!(extractor.context_for(&set).is_none());
    }

    #[test]
    fn context_merges_all_sources() {
        let extractor = RoleExtractor::new("api-gateway");
        let set = claims(json!({
            "sub": "kc-42",
            "scope": "profile",
            "realm_access": { "roles": ["USER"] },
            "resource_access": { "api-gateway": { "roles": ["ADMIN"] } }
        }));
        let context = extractor.context_for(&set).unwrap();
        assert_eq!(context.subject(), "kc-42");
        assert!(context.has_role("ADMIN"));
        assert!(context.has_role("USER"));
        assert!(context.has_authority(&Authority::scope("profile")));
    }
}
