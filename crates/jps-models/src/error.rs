//! Model error types.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or parsing domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("Invalid password hash: {0}")]
    InvalidPasswordHash(String),

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Identity already assigned: {0}")]
    IdentityAlreadyAssigned(String),
}

impl ModelError {
    pub fn invalid_object_id(msg: impl Into<String>) -> Self {
        Self::InvalidObjectId(msg.into())
    }

    pub fn invalid_password_hash(msg: impl Into<String>) -> Self {
        Self::InvalidPasswordHash(msg.into())
    }
}
