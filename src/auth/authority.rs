// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical authority identifiers.
//!
//! An authority is the string form of a granted permission. Role claims
//! become `ROLE_<role>` and OAuth scopes become `SCOPE_<scope>`. The role
//! name is kept exactly as the identity provider sent it: `admin` and
//! `ADMIN` are different authorities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker prepended to every role-derived authority.
pub const ROLE_PREFIX: &str = "ROLE_";

/// Marker prepended to every scope-derived authority.
pub const SCOPE_PREFIX: &str = "SCOPE_";

/// A granted permission, e.g. `ROLE_ADMIN` or `SCOPE_profile`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authority(String);

impl Authority {
    /// Authority for a role claim.
    pub fn role(name: &str) -> Self {
        Self(format!("{ROLE_PREFIX}{name}"))
    }

    /// Authority for an OAuth scope.
    pub fn scope(name: &str) -> Self {
        Self(format!("{SCOPE_PREFIX}{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The role name if this is a role authority.
    pub fn role_name(&self) -> Option<&str> {
        self.0.strip_prefix(ROLE_PREFIX)
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_authority_is_prefixed() {
        assert_eq!(Authority::role("ADMIN").as_str(), "ROLE_ADMIN");
        assert_eq!(Authority::scope("email").as_str(), "SCOPE_email");
    }

    #[test]
    fn role_case_is_preserved() {
        assert_ne!(Authority::role("admin"), Authority::role("ADMIN"));
        assert_eq!(Authority::role("Admin").role_name(), Some("Admin"));
    }

    #[test]
    fn scope_has_no_role_name() {
        assert_eq!(Authority::scope("openid").role_name(), None);
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Authority::role("USER")).unwrap();
        assert_eq!(json, r#""ROLE_USER""#);
    }
}
