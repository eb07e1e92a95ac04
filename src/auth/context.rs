// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request authorization context.

use std::collections::BTreeSet;

use super::authority::Authority;

/// The verified subject plus every authority granted to it.
///
/// Built once per request from the token and dropped with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationContext {
    subject: String,
    authorities: BTreeSet<Authority>,
}

impl AuthorizationContext {
    /// Union of the scope, realm and client authority sets.
    ///
    /// Order of the inputs is irrelevant and duplicates collapse.
    pub fn aggregate(
        subject: impl Into<String>,
        default_authorities: BTreeSet<Authority>,
        realm_authorities: BTreeSet<Authority>,
        client_authorities: BTreeSet<Authority>,
    ) -> Self {
        let mut authorities = default_authorities;
        authorities.extend(realm_authorities);
        authorities.extend(client_authorities);
        Self {
            subject: subject.into(),
            authorities,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn authorities(&self) -> &BTreeSet<Authority> {
        &self.authorities
    }

    /// Exact membership test, no wildcard or implied roles.
    pub fn has_authority(&self, authority: &Authority) -> bool {
        self.authorities.contains(authority)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.has_authority(&Authority::role(role))
    }
}
