//! Recruiter accounts.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;

use crate::entity::{self, impl_entity};
use crate::error::ModelResult;
use crate::object_id::ObjectId;
use crate::password::PasswordHash;

/// Canonical form of an email used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A hiring account that owns job postings.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recruiter {
    /// Storage identifier, `null` until first save
    id: Option<ObjectId>,

    /// Display name
    pub name: String,

    /// Login and lookup key, always normalized
    email: String,

    /// Company the recruiter hires for
    pub company: Option<String>,

    /// Recruiter's location
    pub location: Option<String>,

    /// Credential digest, never serialized
    #[serde(skip)]
    password: PasswordHash,

    /// Jobs posted by this recruiter, in posting order.
    /// `null` when the stored record has no list at all.
    job_ids: Option<Vec<ObjectId>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    version: u64,
}

impl_entity!(Recruiter, "recruiters");

impl Recruiter {
    /// Create an unsaved recruiter with an empty job list.
    pub fn new(name: impl Into<String>, email: &str, password: PasswordHash) -> Self {
        let now = entity::now();
        Self {
            id: None,
            name: name.into(),
            email: normalize_email(email),
            company: None,
            location: None,
            password,
            job_ids: Some(Vec::new()),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Replace the job list; `None` keeps the record without a list.
    pub fn with_job_ids(mut self, job_ids: Option<Vec<ObjectId>>) -> Self {
        self.job_ids = job_ids;
        self
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn set_email(&mut self, email: &str) {
        self.email = normalize_email(email);
    }

    pub fn password(&self) -> &PasswordHash {
        &self.password
    }

    /// Hash and store a new password.
    pub fn set_password(&mut self, plain: &str) -> ModelResult<()> {
        self.password = PasswordHash::hash(plain)?;
        Ok(())
    }

    pub fn set_password_hash(&mut self, password: PasswordHash) {
        self.password = password;
    }

    pub fn verify_password(&self, plain: &str) -> bool {
        self.password.verify(plain)
    }

    pub fn job_ids(&self) -> Option<&[ObjectId]> {
        self.job_ids.as_deref()
    }

    pub fn has_job_id(&self, job_id: &ObjectId) -> bool {
        self.job_ids
            .as_ref()
            .is_some_and(|ids| ids.contains(job_id))
    }

    /// Append a job id, creating the list if it is unset.
    ///
    /// Duplicates are kept.
    pub fn add_job_id(&mut self, job_id: ObjectId) {
        self.job_ids.get_or_insert_with(Vec::new).push(job_id);
    }

    /// Remove the first occurrence of `job_id`.
    ///
    /// Returns `false` and leaves the list untouched if the id is absent or the
    /// list is unset.
    pub fn remove_job_id(&mut self, job_id: &ObjectId) -> bool {
        let Some(ids) = self.job_ids.as_mut() else {
            return false;
        };
        match ids.iter().position(|id| id == job_id) {
            Some(pos) => {
                ids.remove(pos);
                true
            }
            None => false,
        }
    }
}
