// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity reconciliation.
//!
//! Maps a verified subject onto its local [`Identity`], creating the record
//! on first contact, and carries the profile-completion lifecycle.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::model::{Identity, IdentityResponse, NewIdentity, Page, PageRequest, ProfilePatch};
use super::store::{IdentityStore, Inserted, StoreError};
use super::IdentityError;

/// Profile claims offered at first contact.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstContact<'a> {
    pub email: Option<&'a str>,
    pub display_name: Option<&'a str>,
    pub preferred_handle: Option<&'a str>,
}

#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn IdentityStore>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    /// Resolve the identity for `subject_id`, creating it if unseen.
    ///
    /// Known subjects are returned as stored; later claims never overwrite
    /// the record. Racing first logins resolve to a single record.
    pub fn get_or_create(
        &self,
        subject_id: &str,
        claims: FirstContact<'_>,
    ) -> Result<Identity, IdentityError> {
        if let Some(existing) = self.store.find_by_subject(subject_id)? {
            return Ok(existing);
        }

        let email = claims
            .email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                IdentityError::Validation("token carries no email claim".to_string())
            })?;

        let candidate = Identity::create(NewIdentity {
            subject_id: subject_id.to_string(),
            email: email.to_string(),
            full_name: non_blank(claims.display_name),
            role: non_blank(claims.preferred_handle),
        });

        match self.store.insert_if_absent(candidate) {
            Ok(Inserted::Created(identity)) => {
                info!(identity_id = %identity.id, "Identity created on first login");
                Ok(identity)
            }
            Ok(Inserted::Existing(identity)) => Ok(identity),
            Err(StoreError::EmailTaken(email)) => {
                warn!(subject = %subject_id, "First login email is taken");
                Err(IdentityError::Conflict(format!(
                    "Email {email} is already registered"
                )))
            }
            Err(StoreError::SubjectDeprovisioned(_)) => {
                warn!(subject = %subject_id, "Login refused for deprovisioned subject");
                Err(IdentityError::Deprovisioned(subject_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Merge a partial profile and mark the profile complete.
    pub fn update_profile(
        &self,
        subject_id: &str,
        patch: &ProfilePatch,
    ) -> Result<IdentityResponse, IdentityError> {
        let mut identity = self
            .store
            .find_by_subject(subject_id)?
            .ok_or_else(|| IdentityError::NotFound("User not found".to_string()))?;

        patch.validate()?;
        patch.apply_to(&mut identity);
        identity.profile_completed = true;

        match self.store.update(&identity) {
            Ok(()) => {}
            Err(StoreError::EmailTaken(email)) => {
                warn!(identity_id = %identity.id, "Profile email is taken");
                return Err(IdentityError::Conflict(format!(
                    "Email {email} is already registered"
                )));
            }
            Err(StoreError::NotFound(_)) => {
                return Err(IdentityError::NotFound("User not found".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        info!(identity_id = %identity.id, "Profile completed");
        Ok(identity.into())
    }

    pub fn find_all(&self, request: &PageRequest) -> Result<Page<IdentityResponse>, IdentityError> {
        Ok(request.paginate(self.store.list()?))
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<IdentityResponse, IdentityError> {
        self.store
            .find_by_id(id)?
            .map(IdentityResponse::from)
            .ok_or_else(|| IdentityError::NotFound("User not found".to_string()))
    }

    /// Permanently remove an identity; its subject stays deprovisioned.
    pub fn delete_by_id(&self, id: Uuid) -> Result<(), IdentityError> {
        match self.store.delete(id) {
            Ok(removed) => {
                info!(identity_id = %removed.id, "Identity deleted");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => {
                Err(IdentityError::NotFound("User not found".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Allow a deleted subject to be provisioned again on its next login.
    pub fn reprovision(&self, subject_id: &str) -> Result<(), IdentityError> {
        if self.store.reprovision(subject_id)? {
            info!(subject = %subject_id, "Subject reprovisioned");
            Ok(())
        } else {
            Err(IdentityError::NotFound(
                "Subject is not deprovisioned".to_string(),
            ))
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::store::MemoryIdentityStore;
    use crate::identity::IdentityDatabase;

    fn service() -> IdentityService {
        IdentityService::new(Arc::new(MemoryIdentityStore::new()))
    }

    fn contact<'a>(email: &'a str, name: &'a str) -> FirstContact<'a> {
        FirstContact {
            email: Some(email),
            display_name: Some(name),
            preferred_handle: Some("ada"),
        }
    }

    #[test]
    fn first_contact_creates_incomplete_identity() {
        let svc = service();
        let identity = svc
            .get_or_create("kc-1", contact("ada@example.com", "Ada"))
            .unwrap();
        assert!(!identity.profile_completed);
        assert_eq!(identity.full_name.as_deref(), Some("Ada"));
        assert_eq!(identity.role.as_deref(), Some("ada"));
        assert!(identity.phone.is_none());
    }

    #[test]
    fn concurrent_first_logins_share_one_identity() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = IdentityDatabase::open(&dir.path().join("identities.redb")).unwrap();
        let svc = IdentityService::new(Arc::new(db));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                std::thread::spawn(move || {
                    svc.get_or_create("kc-race", contact("race@example.com", "Racer"))
                        .unwrap()
                        .id
                })
            })
            .collect();
        let ids: Vec<Uuid> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(ids.iter().all(|id| *id == ids[0]));
        let stored = svc.store().list().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, ids[0]);
    }

    #[test]
    fn repeat_login_returns_frozen_record() {
        let svc = service();
        let first = svc
            .get_or_create("kc-1", contact("ada@example.com", "Ada"))
            .unwrap();
        let second = svc
            .get_or_create("kc-1", contact("countess@example.com", "Countess"))
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.email, "ada@example.com");
        assert_eq!(second.full_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn missing_email_is_a_validation_error() {
        let svc = service();
        let result = svc.get_or_create("kc-1", FirstContact::default());
        assert!(matches!(result, Err(IdentityError::Validation(_))));
        assert!(svc.store().list().unwrap().is_empty());
    }

    #[test]
    fn email_owned_by_other_subject_conflicts() {
        let svc = service();
        svc.get_or_create("kc-1", contact("ada@example.com", "Ada"))
            .unwrap();
        let result = svc.get_or_create("kc-2", contact("ADA@example.com", "Impostor"));
        assert!(matches!(result, Err(IdentityError::Conflict(_))));
        assert_eq!(svc.store().list().unwrap().len(), 1);
    }

    #[test]
    fn update_profile_merges_and_completes() {
        let svc = service();
        svc.get_or_create("kc-1", contact("ada@example.com", "Ada"))
            .unwrap();

        let patch = ProfilePatch {
            full_name: Some(String::new()),
            phone: Some("555".to_string()),
            email: None,
        };
        let updated = svc.update_profile("kc-1", &patch).unwrap();
        assert_eq!(updated.phone.as_deref(), Some("555"));
        assert_eq!(updated.full_name.as_deref(), Some("Ada"));
        assert_eq!(updated.email, "ada@example.com");
        assert!(updated.profile_completed);
    }

    #[test]
    fn update_profile_for_unknown_subject_creates_nothing() {
        let svc = service();
        let patch = ProfilePatch {
            phone: Some("555".to_string()),
            ..Default::default()
        };
        let result = svc.update_profile("kc-ghost", &patch);
        assert!(matches!(result, Err(IdentityError::NotFound(_))));
        assert!(svc.store().list().unwrap().is_empty());
    }

    #[test]
    fn update_profile_email_collision_conflicts() {
        let svc = service();
        svc.get_or_create("kc-1", contact("ada@example.com", "Ada"))
            .unwrap();
        svc.get_or_create("kc-2", contact("grace@example.com", "Grace"))
            .unwrap();

        let patch = ProfilePatch {
            email: Some("ada@example.com".to_string()),
            ..Default::default()
        };
        let result = svc.update_profile("kc-2", &patch);
        assert!(matches!(result, Err(IdentityError::Conflict(_))));
    }

    #[test]
    fn delete_twice_is_not_found() {
        let svc = service();
        let identity = svc
            .get_or_create("kc-1", contact("ada@example.com", "Ada"))
            .unwrap();
        svc.delete_by_id(identity.id).unwrap();
        assert!(matches!(
            svc.delete_by_id(identity.id),
            Err(IdentityError::NotFound(_))
        ));
        assert!(matches!(
            svc.find_by_id(identity.id),
            Err(IdentityError::NotFound(_))
        ));
    }

    #[test]
    fn deleted_subject_stays_out_until_reprovisioned() {
        let svc = service();
        let identity = svc
            .get_or_create("kc-1", contact("ada@example.com", "Ada"))
            .unwrap();
        svc.delete_by_id(identity.id).unwrap();

        let result = svc.get_or_create("kc-1", contact("ada@example.com", "Ada"));
        assert!(matches!(result, Err(IdentityError::Deprovisioned(_))));

        svc.reprovision("kc-1").unwrap();
        let fresh = svc
            .get_or_create("kc-1", contact("ada@example.com", "Ada"))
            .unwrap();
        assert_ne!(fresh.id, identity.id);
        assert!(!fresh.profile_completed);

        assert!(matches!(
            svc.reprovision("kc-1"),
            Err(IdentityError::NotFound(_))
        ));
    }

    #[test]
    fn find_all_pages_projections() {
        let svc = service();
        for i in 0..3 {
            let email = format!("u{i}@example.com");
            svc.get_or_create(
                &format!("kc-{i}"),
                FirstContact {
                    email: Some(email.as_str()),
                    ..Default::default()
                },
            )
            .unwrap();
        }
        let page = svc
            .find_all(&PageRequest {
                size: 2,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.total_pages, 2);
    }
}
