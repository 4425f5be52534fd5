//! Applications submitted against a job.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;

use crate::entity::{self, impl_entity};
use crate::object_id::ObjectId;

/// An application for exactly one job.
///
/// Many applications may reference the same job.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    /// Storage identifier, `null` until first save
    id: Option<ObjectId>,

    /// The job applied to
    pub job_id: ObjectId,

    /// Applicant's full name
    pub applicant_name: String,

    /// Applicant's contact email
    pub applicant_email: String,

    /// Link to the applicant's resume
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    version: u64,
}

impl_entity!(JobApplication, "job_applications");

impl JobApplication {
    /// Create an unsaved application.
    pub fn new(
        job_id: ObjectId,
        applicant_name: impl Into<String>,
        applicant_email: impl Into<String>,
    ) -> Self {
        let now = entity::now();
        Self {
            id: None,
            job_id,
            applicant_name: applicant_name.into(),
            applicant_email: applicant_email.into(),
            resume_url: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn with_resume_url(mut self, url: impl Into<String>) -> Self {
        self.resume_url = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_serializes_as_hex() {
        let job_id = ObjectId::parse_str("650abcde0102030405ff0010").unwrap();
        let app = JobApplication::new(job_id, "Asha", "asha@example.com");

        let json = serde_json::to_value(&app).unwrap();
        assert!(json["id"].is_null());
        assert_eq!(json["jobId"], "650abcde0102030405ff0010");
        assert_eq!(json["applicantEmail"], "asha@example.com");
        assert!(json.get("resumeUrl").is_none());
    }
}
