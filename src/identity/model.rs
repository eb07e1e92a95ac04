// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity records and their API projections.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::IdentityError;

/// Longest accepted full name, in characters.
pub const MAX_FULL_NAME_LEN: usize = 255;

/// Longest accepted phone number, in characters.
pub const MAX_PHONE_LEN: usize = 50;

/// Largest page an administrator may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Durable local record of one caller.
///
/// `subject_id` is the identity provider's `sub` claim and never leaves
/// the service; the API exposes [`IdentityResponse`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub subject_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub profile_completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Attributes for a first-contact identity.
#[derive(Debug, Clone, Default)]
pub struct NewIdentity {
    pub subject_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Option<String>,
}

impl Identity {
    /// Fresh record with a generated id; the profile starts incomplete.
    pub fn create(new: NewIdentity) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id: new.subject_id,
            email: new.email,
            full_name: new.full_name,
            phone: None,
            role: new.role,
            profile_completed: false,
            created_at: Utc::now(),
        }
    }
}

/// Lookup key for the email uniqueness index.
pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// External projection of an [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    /// Internal identifier.
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// False until the caller has submitted a profile update.
    pub profile_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Identity> for IdentityResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email,
            full_name: identity.full_name,
            phone: identity.phone,
            role: identity.role,
            profile_completed: identity.profile_completed,
            created_at: identity.created_at,
        }
    }
}

/// Partial profile update submitted by the caller.
///
/// Absent and blank fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ProfilePatch {
    /// Reject oversized fields, malformed email and empty patches.
    pub fn validate(&self) -> Result<(), IdentityError> {
        let full_name = present(&self.full_name);
        let phone = present(&self.phone);
        let email = present(&self.email);

        if full_name.is_none() && phone.is_none() && email.is_none() {
            return Err(IdentityError::Validation(
                "at least one of fullName, phone or email is required".to_string(),
            ));
        }

        let mut problems = Vec::new();
        if full_name.is_some_and(|v| v.chars().count() > MAX_FULL_NAME_LEN) {
            problems.push(format!(
                "fullName: must be at most {MAX_FULL_NAME_LEN} characters"
            ));
        }
        if phone.is_some_and(|v| v.chars().count() > MAX_PHONE_LEN) {
            problems.push(format!("phone: must be at most {MAX_PHONE_LEN} characters"));
        }
        if email.is_some_and(|v| !looks_like_email(v)) {
            problems.push("email: should be valid".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(IdentityError::Validation(problems.join(", ")))
        }
    }

    /// Overwrite the fields this patch carries.
    pub fn apply_to(&self, identity: &mut Identity) {
        if let Some(full_name) = present(&self.full_name) {
            identity.full_name = Some(full_name.to_string());
        }
        if let Some(phone) = present(&self.phone) {
            identity.phone = Some(phone.to_string());
        }
        if let Some(email) = present(&self.email) {
            identity.email = email.to_string();
        }
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// `local@domain.tld` with no whitespace.
fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Sort key accepted by the admin listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    Email,
    FullName,
}

impl SortKey {
    /// Parse the wire name; unknown keys fall back to `createdAt`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "email" => SortKey::Email,
            "fullName" => SortKey::FullName,
            _ => SortKey::CreatedAt,
        }
    }

    fn compare(self, a: &Identity, b: &Identity) -> Ordering {
        match self {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::Email => email_key(&a.email).cmp(&email_key(&b.email)),
            SortKey::FullName => a.full_name.cmp(&b.full_name),
        }
    }
}

/// Admin listing query, `?page=0&size=10&sortBy=createdAt&direction=desc`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageRequest {
    /// Zero-based page index.
    #[serde(default)]
    pub page: usize,
    /// Page size (1..=100, default 10).
    #[serde(default = "default_page_size")]
    pub size: usize,
    /// `createdAt`, `email` or `fullName`.
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    /// `asc` or `desc` (default).
    #[serde(default = "default_direction")]
    pub direction: String,
}

fn default_page_size() -> usize {
    10
}

fn default_sort_by() -> String {
    "createdAt".to_string()
}

fn default_direction() -> String {
    "desc".to_string()
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_page_size(),
            sort_by: default_sort_by(),
            direction: default_direction(),
        }
    }
}

impl PageRequest {
    pub fn clamped_size(&self) -> usize {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }

    fn ascending(&self) -> bool {
        self.direction.eq_ignore_ascii_case("asc")
    }

    /// Sort and slice a full listing into one page of projections.
    pub fn paginate(&self, mut identities: Vec<Identity>) -> Page<IdentityResponse> {
        let key = SortKey::parse(&self.sort_by);
        identities.sort_by(|a, b| {
            let ord = key.compare(a, b).then_with(|| a.id.cmp(&b.id));
            if self.ascending() {
                ord
            } else {
                ord.reverse()
            }
        });

        let size = self.clamped_size();
        let total_elements = identities.len();
        let content = identities
            .into_iter()
            .skip(self.page.saturating_mul(size))
            .take(size)
            .map(IdentityResponse::from)
            .collect();

        Page {
            content,
            page: self.page,
            size,
            total_elements,
            total_pages: total_elements.div_ceil(size),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}
