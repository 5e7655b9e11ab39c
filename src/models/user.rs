// src/models/user.rs
//! End-user identity records.

use crate::models::verification_request::RequestSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A registered end user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    /// Unique login identifier
    pub email: String,
    /// PHC-style PBKDF2 hash, never serialized
    pub hashed_password: String,
    /// Decentralized identifier minted at registration
    /// Example: "did:example:6f1c0d1e-..."
    pub did: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`User`]; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
    pub did: Option<String>,
}

impl NewUser {
    /// Builds a new user row with a freshly minted `did:example:` identifier.
    pub fn with_generated_did(email: String, hashed_password: String) -> Self {
        Self {
            email,
            hashed_password,
            did: Some(format!("did:example:{}", Uuid::new_v4())),
        }
    }
}

/// Minimal user shape attached to request listings.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// Full user response including every request the user is the subject of.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
    pub verification_requests: Vec<RequestSummary>,
}

impl UserView {
    pub fn new(user: &User, verification_requests: Vec<RequestSummary>) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            did: user.did.clone(),
            verification_requests,
        }
    }
}
