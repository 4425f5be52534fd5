//! Shared data models for the job posting system backend.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, job applications and recruiters
//! - Storage identifiers ([`ObjectId`]) and their hex form
//! - Password hashing for recruiter credentials

pub mod application;
pub mod entity;
pub mod error;
pub mod job;
pub mod object_id;
pub mod password;
pub mod recruiter;

// Re-export common types
pub use application::JobApplication;
pub use entity::Entity;
pub use error::{ModelError, ModelResult};
pub use job::Job;
pub use object_id::ObjectId;
pub use password::PasswordHash;
pub use recruiter::{normalize_email, Recruiter};
