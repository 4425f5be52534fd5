//! Job postings.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;

use crate::entity::{self, impl_entity};
use crate::object_id::ObjectId;

/// A posted position.
///
/// Owned by a recruiter by convention only: the recruiter's `jobIds` list
/// points here, nothing points back.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Storage identifier, `null` until first save
    id: Option<ObjectId>,

    /// Position title (e.g. "Software Engineer")
    pub position: String,

    /// Hiring company
    pub company: String,

    /// Job location
    pub location: String,

    /// Experience required (e.g. "3+ years")
    pub experience: String,

    /// Free-form description
    pub description: String,

    /// Required skills
    pub skills: Vec<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Optimistic-concurrency version, 0 until first save
    version: u64,
}

impl_entity!(Job, "jobs");

impl Job {
    /// Create an unsaved job posting.
    pub fn new(
        position: impl Into<String>,
        company: impl Into<String>,
        location: impl Into<String>,
        experience: impl Into<String>,
    ) -> Self {
        let now = entity::now();
        Self {
            id: None,
            position: position.into(),
            company: company.into(),
            location: location.into(),
            experience: experience.into(),
            description: String::new(),
            skills: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;

    #[test]
    fn test_new_job_is_unsaved() {
        let job = Job::new("Backend Engineer", "Acme", "Bangalore", "3+ years");
        assert_eq!(job.id(), None);
        assert_eq!(job.version(), 0);
        assert!(job.is_new());
        assert_eq!(Job::COLLECTION, "jobs");
    }

    #[test]
    fn test_job_json_shape() {
        let mut job = Job::new("Backend Engineer", "Acme", "Bangalore", "3+ years")
            .with_description("Build services")
            .with_skills(["Rust", "SQL"]);

        let json = serde_json::to_value(&job).unwrap();
        assert!(json["id"].is_null());
        assert_eq!(json["position"], "Backend Engineer");
        assert_eq!(json["skills"], serde_json::json!(["Rust", "SQL"]));
        assert!(json.get("createdAt").is_some());

        let id = ObjectId::parse_str("650abcde0102030405ff0010").unwrap();
        job.assign_identity(id, 1).unwrap();
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["id"], "650abcde0102030405ff0010");
        assert_eq!(json["version"], 1);
    }
}
