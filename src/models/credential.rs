// src/models/credential.rs
//! Verifiable Credential data model.
//!
//! A credential is a claim document about a user signed by the issuer with
//! the server-held secret. The signed document is persisted verbatim as JSON
//! in a [`Credential`] row owned by the subject.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A signed claim document about a single user.
///
/// # Fields
/// - `issuer_did`: identifier of the issuing service
/// - `subject_id`: id of the user the claims are about
/// - `claim_data`: free-form key/value claims
/// - `signature`: HS256 JWS over issuer, subject, claims and issue time
///
/// # Security Considerations
/// - The signature is symmetric; only the issuing server can check it
/// - There is no expiry or revocation list
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VerifiableCredential {
    /// Example: "did:example:issuer"
    pub issuer_did: String,

    /// Example: 42
    pub subject_id: i64,

    /// Example: {"birthYear": 1990, "country": "USA"}
    pub claim_data: Map<String, Value>,

    /// Compact JWS string
    pub signature: String,
}

/// Stored credential row. Immutable after creation.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Credential {
    pub id: i64,
    pub owner_id: i64,
    /// The full signed [`VerifiableCredential`] as JSON
    pub vc_data_json: String,
    pub issuer_did: String,
    pub issued_at: DateTime<Utc>,
}

/// Insert payload; the store assigns `id` and `issued_at`.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub owner_id: i64,
    pub vc_data_json: String,
    pub issuer_did: String,
}
