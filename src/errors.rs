// src/errors.rs
//! Error types shared by the storage and service layers.
//!
//! Absent records are not errors here: lookups return `Option` and the HTTP
//! layer decides how to report a miss.

use thiserror::Error;

/// Failures raised by a [`Store`](crate::storage::Store) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// A unique column already holds the value
    #[error("unique constraint violated on {field}")]
    UniqueViolation { field: &'static str },

    /// A referenced row does not exist
    #[error("foreign key violated on {field}")]
    ForeignKeyViolation { field: &'static str },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Domain failures surfaced by the service layer.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No API key or bearer token was presented
    #[error("credential is missing")]
    MissingCredential,

    /// API key unknown or its verifier inactive, or a bearer token that does
    /// not check out; the cases are not distinguished
    #[error("invalid credential or inactive verifier")]
    InvalidCredential,

    /// Identifier unknown or password mismatch
    #[error("incorrect identifier or password")]
    InvalidCredentials,

    #[error("{0} already registered")]
    DuplicateIdentifier(&'static str),

    /// Malformed registration or request input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("user {0} not found")]
    UserNotFound(i64),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for ServiceError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::UniqueViolation { field: "email" } => {
                ServiceError::DuplicateIdentifier("email")
            }
            StorageError::UniqueViolation {
                field: "company_name",
            } => ServiceError::DuplicateIdentifier("company name"),
            other => ServiceError::Storage(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
