//! Field mapping between entities and Firestore documents.
//!
//! The document id is the entity's hex id. Field names follow the external
//! camelCase JSON names; unset optional values are left out of the document.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use jps_models::{Entity, Job, JobApplication, ObjectId, PasswordHash, Recruiter};

use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, FromFirestoreValue, ToFirestoreValue, Value};

pub const FIELD_VERSION: &str = "version";
pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_UPDATED_AT: &str = "updatedAt";
pub const FIELD_JOB_ID: &str = "jobId";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_JOB_IDS: &str = "jobIds";
pub const FIELD_PASSWORD_HASH: &str = "passwordHash";

/// Conversion of an entity to and from its stored document.
pub trait DocumentMapping: Entity + Sized {
    /// All stored fields, including the bookkeeping ones.
    fn to_fields(&self) -> HashMap<String, Value>;

    /// Rebuild the entity, identity included.
    fn from_document(doc: &Document) -> FirestoreResult<Self>;
}

/// Accumulates fields for one document.
struct Fields(HashMap<String, Value>);

impl Fields {
    fn for_entity<E: Entity>(entity: &E) -> Self {
        let mut fields = Self(HashMap::new());
        fields
            .put(FIELD_VERSION, entity.version())
            .put(FIELD_CREATED_AT, entity.created_at())
            .put(FIELD_UPDATED_AT, entity.updated_at());
        fields
    }

    fn put(&mut self, key: &str, value: impl ToFirestoreValue) -> &mut Self {
        self.0.insert(key.to_string(), value.to_firestore_value());
        self
    }

    fn put_opt<T: ToFirestoreValue>(&mut self, key: &str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.put(key, value);
        }
        self
    }

    fn into_map(self) -> HashMap<String, Value> {
        self.0
    }
}

/// Typed access to a stored document with path-annotated errors.
struct Reader<'a> {
    doc: &'a Document,
    path: String,
}

impl<'a> Reader<'a> {
    fn new(collection: &str, doc: &'a Document) -> Self {
        let path = format!("{}/{}", collection, doc.doc_id().unwrap_or("?"));
        Self { doc, path }
    }

    fn id(&self) -> FirestoreResult<ObjectId> {
        let raw = self
            .doc
            .doc_id()
            .ok_or_else(|| FirestoreError::invalid_document(&self.path, "document has no name"))?;
        ObjectId::parse_str(raw).map_err(|e| FirestoreError::invalid_document(&self.path, e.to_string()))
    }

    fn required<T: FromFirestoreValue>(&self, key: &str) -> FirestoreResult<T> {
        self.optional(key)?.ok_or_else(|| {
            FirestoreError::invalid_document(&self.path, format!("missing field `{}`", key))
        })
    }

    /// Absent and `null` both read as `None`; any other mismatch is an error.
    fn optional<T: FromFirestoreValue>(&self, key: &str) -> FirestoreResult<Option<T>> {
        match self.doc.field(key) {
            None | Some(Value::NullValue(())) => Ok(None),
            Some(value) => T::from_firestore_value(value).map(Some).ok_or_else(|| {
                FirestoreError::invalid_document(&self.path, format!("malformed field `{}`", key))
            }),
        }
    }

    fn string_or_default(&self, key: &str) -> FirestoreResult<String> {
        Ok(self.optional(key)?.unwrap_or_default())
    }

    /// Bind id, version and timestamps read from the document.
    fn restore<E: Entity>(&self, mut entity: E) -> FirestoreResult<E> {
        let version: u64 = self.required(FIELD_VERSION)?;
        let updated_at: DateTime<Utc> = self.required(FIELD_UPDATED_AT)?;
        entity.assign_identity(self.id()?, version)?;
        entity.mark_saved(version, updated_at);
        Ok(entity)
    }

    fn created_at(&self) -> FirestoreResult<DateTime<Utc>> {
        self.required(FIELD_CREATED_AT)
    }
}

impl DocumentMapping for Job {
    fn to_fields(&self) -> HashMap<String, Value> {
        let mut fields = Fields::for_entity(self);
        fields
            .put("position", self.position.as_str())
            .put("company", self.company.as_str())
            .put("location", self.location.as_str())
            .put("experience", self.experience.as_str())
            .put("description", self.description.as_str())
            .put("skills", self.skills.clone());
        fields.into_map()
    }

    fn from_document(doc: &Document) -> FirestoreResult<Self> {
        let r = Reader::new(Self::COLLECTION, doc);
        let mut job = Job::new(
            r.required::<String>("position")?,
            r.string_or_default("company")?,
            r.string_or_default("location")?,
            r.string_or_default("experience")?,
        )
        .with_description(r.string_or_default("description")?)
        .with_skills(r.optional::<Vec<String>>("skills")?.unwrap_or_default());
        job.created_at = r.created_at()?;
        r.restore(job)
    }
}

impl DocumentMapping for JobApplication {
    fn to_fields(&self) -> HashMap<String, Value> {
        let mut fields = Fields::for_entity(self);
        fields
            .put(FIELD_JOB_ID, self.job_id)
            .put("applicantName", self.applicant_name.as_str())
            .put("applicantEmail", self.applicant_email.as_str())
            .put_opt("resumeUrl", self.resume_url.as_deref());
        fields.into_map()
    }

    fn from_document(doc: &Document) -> FirestoreResult<Self> {
        let r = Reader::new(Self::COLLECTION, doc);
        let mut application = JobApplication::new(
            r.required(FIELD_JOB_ID)?,
            r.string_or_default("applicantName")?,
            r.string_or_default("applicantEmail")?,
        );
        application.resume_url = r.optional("resumeUrl")?;
        application.created_at = r.created_at()?;
        r.restore(application)
    }
}

impl DocumentMapping for Recruiter {
    fn to_fields(&self) -> HashMap<String, Value> {
        let mut fields = Fields::for_entity(self);
        fields
            .put("name", self.name.as_str())
            .put(FIELD_EMAIL, self.email())
            .put(FIELD_PASSWORD_HASH, self.password().encode())
            .put_opt("company", self.company.as_deref())
            .put_opt("location", self.location.as_deref())
            .put_opt(FIELD_JOB_IDS, self.job_ids().map(<[ObjectId]>::to_vec));
        fields.into_map()
    }

    fn from_document(doc: &Document) -> FirestoreResult<Self> {
        let r = Reader::new(Self::COLLECTION, doc);
        let encoded: String = r.required(FIELD_PASSWORD_HASH)?;
        let password = PasswordHash::parse(&encoded)?;

        let mut recruiter = Recruiter::new(
            r.string_or_default("name")?,
            &r.required::<String>(FIELD_EMAIL)?,
            password,
        )
        .with_job_ids(r.optional(FIELD_JOB_IDS)?);
        recruiter.company = r.optional("company")?;
        recruiter.location = r.optional("location")?;
        recruiter.created_at = r.created_at()?;
        r.restore(recruiter)
    }
}
