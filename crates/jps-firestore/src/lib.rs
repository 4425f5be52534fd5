//! Firestore persistence for the job posting system.
//!
//! This crate provides:
//! - Typed repositories for jobs, job applications and recruiters
//! - A [`DocumentStore`] abstraction with a Firestore REST implementation and
//!   an in-memory one for tests and local development
//! - Service account authentication via gcp_auth, or an emulator
//! - Optimistic concurrency on every write and retry logic for reads

pub mod application_repo;
pub mod client;
pub mod error;
pub mod job_repo;
pub mod mapping;
pub mod memory;
pub mod metrics;
pub mod recruiter_repo;
pub mod repository;
pub mod retry;
pub mod store;
pub mod token_cache;
pub mod types;


pub use application_repo::JobApplicationRepository;
pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use job_repo::JobRepository;
pub use mapping::DocumentMapping;
pub use memory::InMemoryStore;
pub use recruiter_repo::RecruiterRepository;
pub use repository::Collection;
pub use retry::RetryConfig;
pub use store::DocumentStore;
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
