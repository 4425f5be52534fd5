//! Firestore integration tests.
//!
//! Run against a real project (`GOOGLE_APPLICATION_CREDENTIALS`) or an
//! emulator (`FIRESTORE_EMULATOR_HOST`) with `cargo test -- --ignored`.

use std::sync::Arc;

use jps_firestore::{
    DocumentStore, FirestoreClient, JobApplicationRepository, JobRepository, RecruiterRepository,
};
use jps_models::{Entity, Job, JobApplication, PasswordHash, Recruiter};
use tracing_subscriber::EnvFilter;

async fn store() -> Arc<dyn DocumentStore> {
    dotenvy::dotenv().ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .try_init();

    let client = FirestoreClient::from_env()
        .await
        .expect("Failed to create Firestore client");
    Arc::new(client)
}

/// Test Firestore connection.
#[tokio::test]
#[ignore = "requires Firestore credentials"]
async fn test_firestore_connection() {
    let store = store().await;
    let result = store.get_document("_health", "_check").await;
    assert!(result.is_ok(), "Unexpected error: {:?}", result.err());
}

/// Full job / application / recruiter lifecycle.
#[tokio::test]
#[ignore = "requires Firestore credentials"]
async fn test_repository_lifecycle() {
    let store = store().await;
    let jobs = JobRepository::new(Arc::clone(&store));
    let applications = JobApplicationRepository::new(Arc::clone(&store));
    let recruiters = RecruiterRepository::new(store);

    let job = jobs
        .save(Job::new("Integration Engineer", "Acme", "Remote", "1 year"))
        .await
        .expect("Failed to save job");
    let job_id = job.id().expect("saved job has an id");
    assert_eq!(jobs.find_by_id(&job_id).await.unwrap(), Some(job));

    let application = applications
        .save(JobApplication::new(job_id, "Test Applicant", "applicant@example.com"))
        .await
        .expect("Failed to save application");
    let found = applications.find_by_job_id(&job_id).await.unwrap();
    assert_eq!(found, Some(application.clone()));

    let email = format!("recruiter-{}@example.com", job_id);
    let password = PasswordHash::hash_with_rounds("Integration@1", 1_000).unwrap();
    let recruiter = recruiters
        .save(Recruiter::new("Integration Recruiter", &email, password))
        .await
        .expect("Failed to save recruiter");

    let updated = recruiters
        .append_job(&email, job_id)
        .await
        .expect("Failed to append job")
        .expect("recruiter exists");
    assert_eq!(updated.job_ids(), Some(&[job_id][..]));

    let (after, removed) = recruiters
        .remove_job(&email, job_id)
        .await
        .expect("Failed to remove job")
        .expect("recruiter exists");
    assert!(removed);
    assert_eq!(after.job_ids(), Some(&[][..]));

    let recruiter_id = recruiter.id().unwrap();
    recruiters.delete_by_id(&recruiter_id).await.unwrap();
    applications
        .delete_by_id(&application.id().unwrap())
        .await
        .unwrap();
    jobs.delete_by_id(&job_id).await.unwrap();

    assert!(recruiters.find_by_id(&recruiter_id).await.unwrap().is_none());
    assert!(jobs.find_by_id(&job_id).await.unwrap().is_none());
}
