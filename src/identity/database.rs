// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded identity database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `identities`: id → serialized Identity (JSON bytes)
//! - `subject_index`: external subject → id
//! - `email_index`: lowercased email → id
//! - `deprovisioned_subjects`: subject → RFC 3339 deletion time
//!
//! redb allows one write transaction at a time, so every check-then-write
//! below runs as a single atomic unit.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::model::{email_key, Identity};
use super::store::{IdentityStore, Inserted, StoreError, StoreResult};

// =============================================================================
// Table Definitions
// =============================================================================

const IDENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("identities");

const SUBJECT_INDEX: TableDefinition<&str, &str> = TableDefinition::new("subject_index");

const EMAIL_INDEX: TableDefinition<&str, &str> = TableDefinition::new("email_index");

const DEPROVISIONED: TableDefinition<&str, &str> = TableDefinition::new("deprovisioned_subjects");

/// redb-backed [`IdentityStore`].
pub struct IdentityDatabase {
    db: Database,
}

impl IdentityDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Corrupt(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(IDENTITIES)?;
            let _ = write_txn.open_table(SUBJECT_INDEX)?;
            let _ = write_txn.open_table(EMAIL_INDEX)?;
            let _ = write_txn.open_table(DEPROVISIONED)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

fn decode(bytes: &[u8]) -> StoreResult<Identity> {
    Ok(serde_json::from_slice(bytes)?)
}

impl IdentityStore for IdentityDatabase {
    fn insert_if_absent(&self, candidate: Identity) -> StoreResult<Inserted> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let tombstones = write_txn.open_table(DEPROVISIONED)?;
            if tombstones.get(candidate.subject_id.as_str())?.is_some() {
                return Err(StoreError::SubjectDeprovisioned(candidate.subject_id));
            }

            let mut identities = write_txn.open_table(IDENTITIES)?;
            let mut subjects = write_txn.open_table(SUBJECT_INDEX)?;
            let mut emails = write_txn.open_table(EMAIL_INDEX)?;

            let existing_id = subjects
                .get(candidate.subject_id.as_str())?
                .map(|v| v.value().to_string());

            if let Some(existing_id) = existing_id {
                let bytes = identities
                    .get(existing_id.as_str())?
                    .map(|v| v.value().to_vec())
                    .ok_or_else(|| {
                        StoreError::Corrupt(format!(
                            "subject index points at missing {existing_id}"
                        ))
                    })?;
                Inserted::Existing(decode(&bytes)?)
            } else {
                let key = email_key(&candidate.email);
                if emails.get(key.as_str())?.is_some() {
                    return Err(StoreError::EmailTaken(candidate.email));
                }

                let id = candidate.id.to_string();
                let json = serde_json::to_vec(&candidate)?;
                identities.insert(id.as_str(), json.as_slice())?;
                subjects.insert(candidate.subject_id.as_str(), id.as_str())?;
                emails.insert(key.as_str(), id.as_str())?;
                Inserted::Created(candidate)
            }
        };
        // Committing a read-only outcome is harmless and keeps one exit path.
        write_txn.commit()?;
        Ok(outcome)
    }

    fn find_by_subject(&self, subject_id: &str) -> StoreResult<Option<Identity>> {
        let read_txn = self.db.begin_read()?;
        let subjects = read_txn.open_table(SUBJECT_INDEX)?;
        let Some(id) = subjects.get(subject_id)?.map(|v| v.value().to_string()) else {
            return Ok(None);
        };
        let identities = read_txn.open_table(IDENTITIES)?;
        match identities.get(id.as_str())? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        let read_txn = self.db.begin_read()?;
        let identities = read_txn.open_table(IDENTITIES)?;
        match identities.get(id.to_string().as_str())? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn list(&self) -> StoreResult<Vec<Identity>> {
        let read_txn = self.db.begin_read()?;
        let identities = read_txn.open_table(IDENTITIES)?;
        let mut all = Vec::new();
        for entry in identities.iter()? {
            let (_, value) = entry?;
            all.push(decode(value.value())?);
        }
        Ok(all)
    }

    fn update(&self, identity: &Identity) -> StoreResult<()> {
        let id = identity.id.to_string();
        let write_txn = self.db.begin_write()?;
        {
            let mut identities = write_txn.open_table(IDENTITIES)?;
            let mut emails = write_txn.open_table(EMAIL_INDEX)?;

            let stored_bytes = identities
                .get(id.as_str())?
                .map(|v| v.value().to_vec())
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            let stored = decode(&stored_bytes)?;

            let previous_email = email_key(&stored.email);
            let new_email = email_key(&identity.email);
            if previous_email != new_email {
                let owner = emails.get(new_email.as_str())?.map(|v| v.value().to_string());
                if owner.is_some_and(|owner| owner != id) {
                    return Err(StoreError::EmailTaken(identity.email.clone()));
                }
                emails.remove(previous_email.as_str())?;
                emails.insert(new_email.as_str(), id.as_str())?;
            }

            let json = serde_json::to_vec(identity)?;
            identities.insert(id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete(&self, id: Uuid) -> StoreResult<Identity> {
        let key = id.to_string();
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut identities = write_txn.open_table(IDENTITIES)?;
            let bytes = identities
                .remove(key.as_str())?
                .map(|v| v.value().to_vec())
                .ok_or_else(|| StoreError::NotFound(key.clone()))?;
            let removed = decode(&bytes)?;

            let mut subjects = write_txn.open_table(SUBJECT_INDEX)?;
            subjects.remove(removed.subject_id.as_str())?;
            let mut emails = write_txn.open_table(EMAIL_INDEX)?;
            emails.remove(email_key(&removed.email).as_str())?;
            let mut tombstones = write_txn.open_table(DEPROVISIONED)?;
            tombstones.insert(removed.subject_id.as_str(), Utc::now().to_rfc3339().as_str())?;
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn reprovision(&self, subject_id: &str) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut tombstones = write_txn.open_table(DEPROVISIONED)?;
            let removed = tombstones.remove(subject_id)?;
            removed.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(IDENTITIES)?;
        Ok(())
    }
}
