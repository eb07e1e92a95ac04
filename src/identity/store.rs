// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity storage contract and the in-memory implementation.
//!
//! Uniqueness of subject and email is the store's job, not the caller's.
//! Every mutating method is atomic: two racing first logins for the same
//! subject both see a single stored record, one as `Created` and the
//! other as `Existing`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use uuid::Uuid;

use super::model::{email_key, Identity};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("identity not found: {0}")]
    NotFound(String),

    #[error("email already registered to another identity: {0}")]
    EmailTaken(String),

    #[error("subject has been deprovisioned: {0}")]
    SubjectDeprovisioned(String),

    #[error("store state is corrupt: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of [`IdentityStore::insert_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inserted {
    /// The candidate was stored.
    Created(Identity),
    /// Another record already owns the subject; it is returned untouched.
    Existing(Identity),
}

impl Inserted {
    pub fn into_identity(self) -> Identity {
        match self {
            Inserted::Created(identity) | Inserted::Existing(identity) => identity,
        }
    }
}

/// Durable identity storage.
pub trait IdentityStore: Send + Sync {
    /// Store `candidate` unless its subject is already known.
    ///
    /// Fails with `EmailTaken` if a different subject owns the email and
    /// with `SubjectDeprovisioned` if the subject was deleted.
    fn insert_if_absent(&self, candidate: Identity) -> StoreResult<Inserted>;

    fn find_by_subject(&self, subject_id: &str) -> StoreResult<Option<Identity>>;

    fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Identity>>;

    /// Every stored identity, unordered.
    fn list(&self) -> StoreResult<Vec<Identity>>;

    /// Replace an existing record, keeping the email index consistent.
    fn update(&self, identity: &Identity) -> StoreResult<()>;

    /// Remove a record and tombstone its subject. Returns the removed record.
    fn delete(&self, id: Uuid) -> StoreResult<Identity>;

    /// Clear a tombstone. Returns whether one existed.
    fn reprovision(&self, subject_id: &str) -> StoreResult<bool>;

    /// Cheap liveness probe for `/health`.
    fn health_check(&self) -> StoreResult<()>;
}

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Default)]
struct MemoryState {
    by_id: HashMap<Uuid, Identity>,
    subjects: HashMap<String, Uuid>,
    emails: HashMap<String, Uuid>,
    tombstones: HashSet<String>,
}

/// Mutex-guarded store for tests and ephemeral deployments.
#[derive(Default)]
pub struct MemoryIdentityStore {
    state: Mutex<MemoryState>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> StoreResult<T>) -> StoreResult<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Corrupt("identity store lock poisoned".to_string()))?;
        f(&mut state)
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn insert_if_absent(&self, candidate: Identity) -> StoreResult<Inserted> {
        self.with_state(|state| {
            if state.tombstones.contains(&candidate.subject_id) {
                return Err(StoreError::SubjectDeprovisioned(candidate.subject_id));
            }
            if let Some(existing) = state
                .subjects
                .get(&candidate.subject_id)
                .and_then(|id| state.by_id.get(id))
            {
                return Ok(Inserted::Existing(existing.clone()));
            }
            let key = email_key(&candidate.email);
            if state.emails.contains_key(&key) {
                return Err(StoreError::EmailTaken(candidate.email));
            }

            state.subjects.insert(candidate.subject_id.clone(), candidate.id);
            state.emails.insert(key, candidate.id);
            state.by_id.insert(candidate.id, candidate.clone());
            Ok(Inserted::Created(candidate))
        })
    }

    fn find_by_subject(&self, subject_id: &str) -> StoreResult<Option<Identity>> {
        self.with_state(|state| {
            Ok(state
                .subjects
                .get(subject_id)
                .and_then(|id| state.by_id.get(id))
                .cloned())
        })
    }

    fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        self.with_state(|state| Ok(state.by_id.get(&id).cloned()))
    }

    fn list(&self) -> StoreResult<Vec<Identity>> {
        self.with_state(|state| Ok(state.by_id.values().cloned().collect()))
    }

    fn update(&self, identity: &Identity) -> StoreResult<()> {
        self.with_state(|state| {
            let previous_email = state
                .by_id
                .get(&identity.id)
                .map(|stored| email_key(&stored.email))
                .ok_or_else(|| StoreError::NotFound(identity.id.to_string()))?;

            let new_email = email_key(&identity.email);
            if new_email != previous_email {
                if state.emails.get(&new_email).is_some_and(|owner| *owner != identity.id) {
                    return Err(StoreError::EmailTaken(identity.email.clone()));
                }
                state.emails.remove(&previous_email);
                state.emails.insert(new_email, identity.id);
            }
            state.by_id.insert(identity.id, identity.clone());
            Ok(())
        })
    }

    fn delete(&self, id: Uuid) -> StoreResult<Identity> {
        self.with_state(|state| {
            let removed = state
                .by_id
                .remove(&id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            state.subjects.remove(&removed.subject_id);
            state.emails.remove(&email_key(&removed.email));
            state.tombstones.insert(removed.subject_id.clone());
            Ok(removed)
        })
    }

    fn reprovision(&self, subject_id: &str) -> StoreResult<bool> {
        self.with_state(|state| Ok(state.tombstones.remove(subject_id)))
    }

    fn health_check(&self) -> StoreResult<()> {
        self.with_state(|_| Ok(()))
    }
}
