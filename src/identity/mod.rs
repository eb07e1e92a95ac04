// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Module
//!
//! Local user records keyed by the identity provider's subject.
//!
//! ## Lifecycle
//!
//! 1. First authenticated call for an unseen subject creates the record
//!    with `profile_completed = false`
//! 2. `PUT /api/v1/users/me` merges profile fields and completes the profile
//! 3. Administrative deletion removes the record and tombstones the subject
//! 4. A tombstoned subject is refused until an administrator reprovisions it
//!
//! ## Storage
//!
//! [`IdentityDatabase`] keeps records in redb; [`MemoryIdentityStore`]
//! backs tests. Both enforce subject and email uniqueness atomically.

pub mod database;
pub mod model;
pub mod service;
pub mod store;

pub use database::IdentityDatabase;
pub use model::{Identity, IdentityResponse, Page, PageRequest, ProfilePatch};
pub use service::{FirstContact, IdentityService};
pub use store::{IdentityStore, MemoryIdentityStore, StoreError};

/// Reconciler failures, mapped to HTTP by [`crate::error::ApiError`].
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("subject {0} has been deprovisioned")]
    Deprovisioned(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}
