// src/models/verification_request.rs
//! Verification request records and their status vocabulary.
//!
//! `status` is a free-form string. The three canonical values are exported as
//! constants, but neither the model nor the lifecycle manager rejects other
//! values or re-transitions out of a terminal state.

use crate::models::user::UserSummary;
use crate::models::verifier::VerifierSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

/// A verifier's ask to check a policy about a user.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VerificationRequest {
    pub id: i64,
    pub verifier_id: i64,
    pub user_id: i64,
    /// Opaque predicate name
    /// Example: "isOver18"
    pub policy_to_check: String,
    pub status: String,
    /// Outcome reported by the proof checker
    /// Example: "Yes"
    pub result: Option<String>,
    /// Explorer link for an on-chain verification, if one was made
    pub etherscan_url: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Unset until the first status update
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload; the store assigns `id`, `created_at` and the initial status.
#[derive(Debug, Clone)]
pub struct NewVerificationRequest {
    pub verifier_id: i64,
    pub user_id: i64,
    pub policy_to_check: String,
}

/// Body of a status transition.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub etherscan_url: Option<String>,
}

/// Request fields nested inside user and verifier responses.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RequestSummary {
    pub id: i64,
    pub policy_to_check: String,
    pub status: String,
    pub result: Option<String>,
    pub etherscan_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&VerificationRequest> for RequestSummary {
    fn from(request: &VerificationRequest) -> Self {
        Self {
            id: request.id,
            policy_to_check: request.policy_to_check.clone(),
            status: request.status.clone(),
            result: request.result.clone(),
            etherscan_url: request.etherscan_url.clone(),
            created_at: request.created_at,
        }
    }
}

/// A request with its subject and initiator attached for display.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationRequestWithRelations {
    #[serde(flatten)]
    pub request: VerificationRequest,
    pub user: UserSummary,
    pub verifier: VerifierSummary,
}
