//! Job postings repository.

use std::sync::Arc;

use jps_models::{Job, ObjectId};

use crate::error::FirestoreResult;
use crate::repository::Collection;
use crate::store::DocumentStore;

/// Repository for `jobs` documents.
#[derive(Clone)]
pub struct JobRepository {
    jobs: Collection<Job>,
}

impl JobRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            jobs: Collection::new(store),
        }
    }

    /// Create or replace a job; see [`Collection::save`].
    pub async fn save(&self, job: Job) -> FirestoreResult<Job> {
        self.jobs.save(job).await
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> FirestoreResult<Option<Job>> {
        self.jobs.find_by_id(id).await
    }

    pub async fn find_all(&self) -> FirestoreResult<Vec<Job>> {
        self.jobs.find_all().await
    }

    /// Delete a job. Applications and recruiter lists that point at it are left alone.
    pub async fn delete_by_id(&self, id: &ObjectId) -> FirestoreResult<()> {
        self.jobs.delete_by_id(id).await
    }

    pub async fn exists(&self, id: &ObjectId) -> FirestoreResult<bool> {
        self.jobs.exists(id).await
    }
}
