// src/models/verifier.rs
//! Verifier organization records.

use crate::models::verification_request::RequestSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// An organization that opens verification requests against users.
#[derive(Debug, Clone, PartialEq)]
pub struct Verifier {
    pub id: i64,
    /// Unique login identifier
    pub company_name: String,
    pub hashed_password: String,
    /// Long-lived bearer secret presented in the `api-key` header
    pub api_key: String,
    /// Stored for future callbacks; nothing delivers to it yet
    pub webhook_url: Option<String>,
    /// Inactive verifiers cannot authenticate with their API key
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`Verifier`]; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewVerifier {
    pub company_name: String,
    pub hashed_password: String,
    pub api_key: String,
    pub webhook_url: Option<String>,
}

impl NewVerifier {
    /// Builds an active verifier row with a freshly generated API key.
    pub fn with_generated_api_key(
        company_name: String,
        hashed_password: String,
        webhook_url: Option<String>,
    ) -> Self {
        Self {
            company_name,
            hashed_password,
            api_key: Uuid::new_v4().to_string(),
            webhook_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VerifierSummary {
    pub id: i64,
    pub company_name: String,
}

impl From<&Verifier> for VerifierSummary {
    fn from(verifier: &Verifier) -> Self {
        Self {
            id: verifier.id,
            company_name: verifier.company_name.clone(),
        }
    }
}

/// Full verifier response, API key included. Returned at registration, from
/// `/verifiers/me` and from the unauthenticated lookup by company name.
#[derive(Debug, Clone, Serialize)]
pub struct VerifierView {
    pub id: i64,
    pub company_name: String,
    pub api_key: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    pub verification_requests: Vec<RequestSummary>,
}

impl VerifierView {
    pub fn new(verifier: &Verifier, verification_requests: Vec<RequestSummary>) -> Self {
        Self {
            id: verifier.id,
            company_name: verifier.company_name.clone(),
            api_key: verifier.api_key.clone(),
            is_active: verifier.is_active,
            webhook_url: verifier.webhook_url.clone(),
            verification_requests,
        }
    }
}
