//! Recruiter accounts repository.

use std::sync::Arc;

use jps_models::{normalize_email, Entity, Job, ObjectId, Recruiter};
use tracing::{info, warn};

use crate::error::{FirestoreError, FirestoreResult};
use crate::mapping::FIELD_EMAIL;
use crate::repository::Collection;
use crate::store::DocumentStore;
use crate::types::Value;

/// Repository for `recruiters` documents.
///
/// Email is the lookup key and is kept unique on save. The check is a read
/// before the write, so two concurrent first saves of the same email can both
/// succeed; lookups then return the one with the smaller id.
#[derive(Clone)]
pub struct RecruiterRepository {
    recruiters: Collection<Recruiter>,
    jobs: Collection<Job>,
}

impl RecruiterRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            recruiters: Collection::new(Arc::clone(&store)),
            jobs: Collection::new(store),
        }
    }

    /// Create or replace a recruiter.
    ///
    /// A write that introduces an email (a new recruiter, or a changed
    /// address) fails with `DuplicateKey` if another recruiter already uses
    /// it. Updates keeping the stored email skip the check, so a record left
    /// behind by a racing first save stays writable. The job list is stored
    /// as given; use [`Self::append_job`] to add verified references.
    pub async fn save(&self, recruiter: Recruiter) -> FirestoreResult<Recruiter> {
        if self.introduces_email(&recruiter).await? {
            if let Some(owner) = self.find_by_email(recruiter.email()).await? {
                if owner.id() != recruiter.id() {
                    warn!(email = %recruiter.email(), "Email already registered");
                    return Err(FirestoreError::DuplicateKey(format!(
                        "{}.{}={}",
                        Recruiter::COLLECTION,
                        FIELD_EMAIL,
                        recruiter.email()
                    )));
                }
            }
        }
        self.recruiters.save(recruiter).await
    }

    async fn introduces_email(&self, recruiter: &Recruiter) -> FirestoreResult<bool> {
        let id = match recruiter.id() {
            Some(id) if recruiter.version() > 0 => id,
            _ => return Ok(true),
        };
        Ok(match self.recruiters.find_by_id(&id).await? {
            Some(stored) => stored.email() != recruiter.email(),
            None => true,
        })
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> FirestoreResult<Option<Recruiter>> {
        self.recruiters.find_by_id(id).await
    }

    pub async fn find_all(&self) -> FirestoreResult<Vec<Recruiter>> {
        self.recruiters.find_all().await
    }

    /// Delete a recruiter. Their jobs stay.
    pub async fn delete_by_id(&self, id: &ObjectId) -> FirestoreResult<()> {
        self.recruiters.delete_by_id(id).await
    }

    /// Recruiter registered under `email`, compared after normalization.
    ///
    /// Query: `email == normalize(email)` ordered by document id, limit 1.
    pub async fn find_by_email(&self, email: &str) -> FirestoreResult<Option<Recruiter>> {
        let mut found = self
            .recruiters
            .find_by_field(FIELD_EMAIL, Value::StringValue(normalize_email(email)), Some(1))
            .await?;
        Ok(found.pop())
    }

    /// Append `job_id` to the job list of the recruiter with `email`.
    ///
    /// The job must exist (`MissingReference` otherwise). Returns `None` when
    /// no recruiter has that email.
    pub async fn append_job(&self, email: &str, job_id: ObjectId) -> FirestoreResult<Option<Recruiter>> {
        if !self.jobs.exists(&job_id).await? {
            return Err(FirestoreError::MissingReference(format!(
                "{}/{}",
                Job::COLLECTION,
                job_id
            )));
        }

        let Some(id) = self.id_for_email(email).await? else {
            return Ok(None);
        };

        let updated = self
            .recruiters
            .modify(&id, |recruiter| {
                recruiter.add_job_id(job_id);
                true
            })
            .await?;

        if updated.is_some() {
            info!(recruiter_id = %id, job_id = %job_id, "Appended job to recruiter");
        }
        Ok(updated.map(|(recruiter, _)| recruiter))
    }

    /// Remove the first occurrence of `job_id` from the recruiter with `email`.
    ///
    /// Returns the recruiter and whether the id was present, or `None` when no
    /// recruiter has that email. An absent id leaves the record untouched.
    pub async fn remove_job(
        &self,
        email: &str,
        job_id: ObjectId,
    ) -> FirestoreResult<Option<(Recruiter, bool)>> {
        let Some(id) = self.id_for_email(email).await? else {
            return Ok(None);
        };

        let result = self
            .recruiters
            .modify(&id, |recruiter| recruiter.remove_job_id(&job_id))
            .await?;

        if let Some((_, true)) = &result {
            info!(recruiter_id = %id, job_id = %job_id, "Removed job from recruiter");
        }
        Ok(result)
    }

    async fn id_for_email(&self, email: &str) -> FirestoreResult<Option<ObjectId>> {
        Ok(self.find_by_email(email).await?.and_then(|r| r.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_repo::JobRepository;
    use crate::memory::InMemoryStore;
    use jps_models::PasswordHash;

    struct Fixture {
        jobs: JobRepository,
        recruiters: RecruiterRepository,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        Fixture {
            jobs: JobRepository::new(Arc::clone(&store)),
            recruiters: RecruiterRepository::new(store),
        }
    }

    fn recruiter(email: &str) -> Recruiter {
        let password = PasswordHash::hash_with_rounds("Welcome@1", 1_000).unwrap();
        Recruiter::new("Anita", email, password).with_company("Acme")
    }

    async fn posted_job(f: &Fixture, position: &str) -> ObjectId {
        let job = Job::new(position, "Acme", "Mumbai", "5 years");
        f.jobs.save(job).await.unwrap().id().unwrap()
    }

    #[tokio::test]
    async fn test_save_then_find_by_id_is_equal() {
        let f = fixture();
        let saved = f.recruiters.save(recruiter("anita@example.com")).await.unwrap();

        let loaded = f.recruiters.find_by_id(&saved.id().unwrap()).await.unwrap();
        assert_eq!(loaded, Some(saved));
    }

    #[tokio::test]
    async fn test_find_by_email_is_normalized() {
        let f = fixture();
        let saved = f.recruiters.save(recruiter("Anita@Example.com")).await.unwrap();

        let found = f.recruiters.find_by_email("  ANITA@example.COM").await.unwrap();
        assert_eq!(found.and_then(|r| r.id()), saved.id());
    }

    #[tokio::test]
    async fn test_find_by_unknown_email_is_none() {
        let f = fixture();
        f.recruiters.save(recruiter("anita@example.com")).await.unwrap();
        assert!(f
            .recruiters
            .find_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let f = fixture();
        f.recruiters.save(recruiter("anita@example.com")).await.unwrap();

        let err = f
            .recruiters
            .save(recruiter("ANITA@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, FirestoreError::DuplicateKey(_)));
        assert_eq!(f.recruiters.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resaving_own_email_is_allowed() {
        let f = fixture();
        let mut saved = f.recruiters.save(recruiter("anita@example.com")).await.unwrap();
        saved.location = Some("Delhi".to_string());

        let updated = f.recruiters.save(saved).await.unwrap();
        assert_eq!(updated.version(), 2);
        assert_eq!(updated.location.as_deref(), Some("Delhi"));
    }

    #[tokio::test]
    async fn test_changing_to_a_taken_email_is_rejected() {
        let f = fixture();
        f.recruiters.save(recruiter("anita@example.com")).await.unwrap();
        let mut other = f.recruiters.save(recruiter("ravi@example.com")).await.unwrap();

        other.set_email("Anita@Example.com");
        let err = f.recruiters.save(other).await.unwrap_err();
        assert!(matches!(err, FirestoreError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn test_shadowed_duplicate_email_stays_writable() {
        let f = fixture();
        // Two first saves that raced past the uniqueness check.
        let a = f.recruiters.recruiters.save(recruiter("dup@example.com")).await.unwrap();
        let b = f.recruiters.recruiters.save(recruiter("dup@example.com")).await.unwrap();
        let mut shadowed = if a.id() > b.id() { a } else { b };

        let owner = f.recruiters.find_by_email("dup@example.com").await.unwrap().unwrap();
        assert_ne!(owner.id(), shadowed.id());

        shadowed.name = "Renamed".to_string();
        let updated = f.recruiters.save(shadowed).await.unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.version(), 2);
    }

    #[tokio::test]
    async fn test_append_and_remove_job() {
        let f = fixture();
        f.recruiters.save(recruiter("anita@example.com")).await.unwrap();
        let a = posted_job(&f, "A").await;
        let b = posted_job(&f, "B").await;

        f.recruiters.append_job("anita@example.com", a).await.unwrap();
        f.recruiters.append_job("anita@example.com", b).await.unwrap();
        let updated = f
            .recruiters
            .append_job("anita@example.com", a)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.job_ids(), Some(&[a, b, a][..]));
        assert_eq!(updated.version(), 4);

        let (after_remove, removed) = f
            .recruiters
            .remove_job("anita@example.com", a)
            .await
            .unwrap()
            .unwrap();
        assert!(removed);
        assert_eq!(after_remove.job_ids(), Some(&[b, a][..]));

        let stored = f
            .recruiters
            .find_by_email("anita@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, after_remove);
    }

    #[tokio::test]
    async fn test_remove_absent_job_leaves_record_unchanged() {
        let f = fixture();
        let saved = f.recruiters.save(recruiter("anita@example.com")).await.unwrap();

        let (unchanged, removed) = f
            .recruiters
            .remove_job("anita@example.com", ObjectId::new())
            .await
            .unwrap()
            .unwrap();
        assert!(!removed);
        assert_eq!(unchanged, saved);
    }

    #[tokio::test]
    async fn test_append_requires_existing_job() {
        let f = fixture();
        f.recruiters.save(recruiter("anita@example.com")).await.unwrap();

        let err = f
            .recruiters
            .append_job("anita@example.com", ObjectId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FirestoreError::MissingReference(_)));
    }

    #[tokio::test]
    async fn test_job_updates_for_unknown_email_are_none() {
        let f = fixture();
        let job = posted_job(&f, "A").await;

        assert!(f.recruiters.append_job("ghost@example.com", job).await.unwrap().is_none());
        assert!(f.recruiters.remove_job("ghost@example.com", job).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let f = fixture();
        f.recruiters.save(recruiter("anita@example.com")).await.unwrap();
        let a = posted_job(&f, "A").await;
        let b = posted_job(&f, "B").await;

        let (ra, rb) = tokio::join!(
            f.recruiters.append_job("anita@example.com", a),
            f.recruiters.append_job("anita@example.com", b),
        );
        ra.unwrap();
        rb.unwrap();

        let stored = f
            .recruiters
            .find_by_email("anita@example.com")
            .await
            .unwrap()
            .unwrap();
        let ids = stored.job_ids().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a) && ids.contains(&b));
    }

    #[tokio::test]
    async fn test_unset_job_list_survives_round_trip() {
        let f = fixture();
        let saved = f
            .recruiters
            .save(recruiter("anita@example.com").with_job_ids(None))
            .await
            .unwrap();

        let loaded = f.recruiters.find_by_id(&saved.id().unwrap()).await.unwrap().unwrap();
        assert_eq!(loaded.job_ids(), None);

        let job = posted_job(&f, "A").await;
        let updated = f
            .recruiters
            .append_job("anita@example.com", job)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.job_ids(), Some(&[job][..]));
    }

    #[tokio::test]
    async fn test_stale_recruiter_save_conflicts_after_append() {
        let f = fixture();
        let saved = f.recruiters.save(recruiter("anita@example.com")).await.unwrap();
        let job = posted_job(&f, "A").await;
        f.recruiters.append_job("anita@example.com", job).await.unwrap();

        let err = f.recruiters.save(saved).await.unwrap_err();
        assert!(err.is_conflict());
    }
}
