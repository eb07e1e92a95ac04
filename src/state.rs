// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{PolicyTable, RoleExtractor, TokenVerifier};
use crate::identity::{IdentityService, IdentityStore, MemoryIdentityStore};

#[derive(Clone)]
pub struct AppState {
    pub identities: IdentityService,
    pub verifier: TokenVerifier,
    pub extractor: RoleExtractor,
    pub policies: Arc<PolicyTable>,
}

impl AppState {
    pub fn new(store: Arc<dyn IdentityStore>, verifier: TokenVerifier) -> Self {
        Self {
            identities: IdentityService::new(store),
            verifier,
            extractor: RoleExtractor::default(),
            policies: Arc::new(PolicyTable::default()),
        }
    }

    pub fn with_extractor(mut self, extractor: RoleExtractor) -> Self {
        self.extractor = extractor;
        self
    }
}

impl Default for AppState {
    /// In-memory store with development token verification.
    fn default() -> Self {
        Self::new(
            Arc::new(MemoryIdentityStore::new()),
            TokenVerifier::development(None),
        )
    }
}
