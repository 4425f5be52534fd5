//! Job applications repository.

use std::sync::Arc;

use jps_models::{Entity, Job, JobApplication, ObjectId};
use tracing::warn;

use crate::error::{FirestoreError, FirestoreResult};
use crate::mapping::FIELD_JOB_ID;
use crate::repository::Collection;
use crate::store::DocumentStore;
use crate::types::ToFirestoreValue;

/// Repository for `job_applications` documents.
#[derive(Clone)]
pub struct JobApplicationRepository {
    applications: Collection<JobApplication>,
    jobs: Collection<Job>,
}

impl JobApplicationRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            applications: Collection::new(Arc::clone(&store)),
            jobs: Collection::new(store),
        }
    }

    /// Create or replace an application.
    ///
    /// A write that introduces `job_id` (a new application, or one pointing at
    /// a different job than the stored record) requires the job to exist, else
    /// `MissingReference`. Updates keeping the stored `job_id` skip the check,
    /// so applications outlive a deleted job.
    pub async fn save(&self, application: JobApplication) -> FirestoreResult<JobApplication> {
        if self.introduces_job(&application).await?
            && !self.jobs.exists(&application.job_id).await?
        {
            warn!(job_id = %application.job_id, "Application references a missing job");
            return Err(FirestoreError::MissingReference(format!(
                "{}/{}",
                Job::COLLECTION,
                application.job_id
            )));
        }
        self.applications.save(application).await
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> FirestoreResult<Option<JobApplication>> {
        self.applications.find_by_id(id).await
    }

    async fn introduces_job(&self, application: &JobApplication) -> FirestoreResult<bool> {
        let id = match application.id() {
            Some(id) if application.version() > 0 => id,
            _ => return Ok(true),
        };
        Ok(match self.applications.find_by_id(&id).await? {
            Some(stored) => stored.job_id != application.job_id,
            None => true,
        })
    }

    pub async fn find_all(&self) -> FirestoreResult<Vec<JobApplication>> {
        self.applications.find_all().await
    }

    pub async fn delete_by_id(&self, id: &ObjectId) -> FirestoreResult<()> {
        self.applications.delete_by_id(id).await
    }

    /// One application for `job_id`.
    ///
    /// Query: `jobId == job_id` ordered by document id, limit 1. Ids grow with
    /// creation time, so the earliest application usually wins when several
    /// match. Ids from different processes in the same second, or made across
    /// an id counter wrap, can sort out of creation order.
    pub async fn find_by_job_id(&self, job_id: &ObjectId) -> FirestoreResult<Option<JobApplication>> {
        let mut found = self
            .applications
            .find_by_field(FIELD_JOB_ID, job_id.to_firestore_value(), Some(1))
            .await?;
        Ok(found.pop())
    }

    /// Every application for `job_id`, in the same order as [`Self::find_by_job_id`].
    pub async fn list_by_job_id(&self, job_id: &ObjectId) -> FirestoreResult<Vec<JobApplication>> {
        self.applications
            .find_by_field(FIELD_JOB_ID, job_id.to_firestore_value(), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_repo::JobRepository;
    use crate::memory::InMemoryStore;

    struct Fixture {
        jobs: JobRepository,
        applications: JobApplicationRepository,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        Fixture {
            jobs: JobRepository::new(Arc::clone(&store)),
            applications: JobApplicationRepository::new(store),
        }
    }

    async fn posted_job(f: &Fixture) -> ObjectId {
        let job = Job::new("Data Engineer", "Acme", "Chennai", "4 years");
        f.jobs.save(job).await.unwrap().id().unwrap()
    }

    #[tokio::test]
    async fn test_save_then_find_by_id_is_equal() {
        let f = fixture();
        let job_id = posted_job(&f).await;

        let saved = f
            .applications
            .save(
                JobApplication::new(job_id, "Meera", "meera@example.com")
                    .with_resume_url("https://example.com/cv.pdf"),
            )
            .await
            .unwrap();

        let loaded = f.applications.find_by_id(&saved.id().unwrap()).await.unwrap();
        assert_eq!(loaded, Some(saved));
    }

    #[tokio::test]
    async fn test_save_requires_existing_job() {
        let f = fixture();
        let err = f
            .applications
            .save(JobApplication::new(ObjectId::new(), "Meera", "meera@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, FirestoreError::MissingReference(p) if p.starts_with("jobs/")));
        assert!(f.applications.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_job_id_picks_earliest_application() {
        let f = fixture();
        let job_x = posted_job(&f).await;
        let job_y = posted_job(&f).await;

        let first = f
            .applications
            .save(JobApplication::new(job_x, "First", "first@example.com"))
            .await
            .unwrap();
        let second = f
            .applications
            .save(JobApplication::new(job_x, "Second", "second@example.com"))
            .await
            .unwrap();
        f.applications
            .save(JobApplication::new(job_y, "Other", "other@example.com"))
            .await
            .unwrap();

        let found = f.applications.find_by_job_id(&job_x).await.unwrap();
        assert_eq!(found, Some(first.clone()));

        let all = f.applications.list_by_job_id(&job_x).await.unwrap();
        assert_eq!(all, vec![first, second]);
    }

    #[tokio::test]
    async fn test_find_by_job_id_without_matches_is_none() {
        let f = fixture();
        let job_id = posted_job(&f).await;
        assert_eq!(f.applications.find_by_job_id(&job_id).await.unwrap(), None);
        assert!(f.applications.list_by_job_id(&job_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_application_of_deleted_job_can_still_be_updated() {
        let f = fixture();
        let job_id = posted_job(&f).await;
        let mut saved = f
            .applications
            .save(JobApplication::new(job_id, "Meera", "meera@example.com"))
            .await
            .unwrap();
        f.jobs.delete_by_id(&job_id).await.unwrap();

        saved.resume_url = Some("https://example.com/cv-v2.pdf".to_string());
        let updated = f.applications.save(saved).await.unwrap();
        assert_eq!(updated.version(), 2);
        assert_eq!(updated.job_id, job_id);

        let loaded = f.applications.find_by_id(&updated.id().unwrap()).await.unwrap();
        assert_eq!(loaded, Some(updated));
    }

    #[tokio::test]
    async fn test_moving_application_to_missing_job_is_rejected() {
        let f = fixture();
        let job_id = posted_job(&f).await;
        let mut saved = f
            .applications
            .save(JobApplication::new(job_id, "Meera", "meera@example.com"))
            .await
            .unwrap();

        saved.job_id = ObjectId::new();
        let err = f.applications.save(saved).await.unwrap_err();
        assert!(matches!(err, FirestoreError::MissingReference(_)));

        let other_job = posted_job(&f).await;
        let mut stored = f.applications.list_by_job_id(&job_id).await.unwrap().remove(0);
        stored.job_id = other_job;
        let moved = f.applications.save(stored).await.unwrap();
        assert_eq!(moved.job_id, other_job);
    }

    #[tokio::test]
    async fn test_deleting_job_does_not_cascade() {
        let f = fixture();
        let job_id = posted_job(&f).await;
        let saved = f
            .applications
            .save(JobApplication::new(job_id, "Meera", "meera@example.com"))
            .await
            .unwrap();

        f.jobs.delete_by_id(&job_id).await.unwrap();

        let loaded = f.applications.find_by_id(&saved.id().unwrap()).await.unwrap();
        assert_eq!(loaded, Some(saved));
    }
}
