// src/services/credential_issuer.rs
//! Credential Issuer Service
//!
//! Mints signed claim documents about registered users and keeps a copy of
//! each one as a [`Credential`] owned by the subject.
//!
//! Credentials are immutable once stored. There is no revocation.

use crate::errors::{ServiceError, ServiceResult};
use crate::models::credential::{Credential, NewCredential, VerifiableCredential};
use crate::services::token_issuer::TokenIssuer;
use crate::storage::Store;
use crate::utils::serialization::{deserialize, serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Country recorded when an issuance request does not name one.
pub const DEFAULT_COUNTRY: &str = "USA";

/// Service for issuing and checking verifiable credentials
#[derive(Clone)]
pub struct CredentialIssuer {
    store: Arc<dyn Store>,
    tokens: Arc<TokenIssuer>,
}

impl CredentialIssuer {
    /// Creates a new CredentialIssuer instance
    ///
    /// # Arguments
    /// * `store` - Persistence boundary holding users and credentials
    /// * `tokens` - Signer configured with the issuer identity and secret
    pub fn new(store: Arc<dyn Store>, tokens: Arc<TokenIssuer>) -> Self {
        Self { store, tokens }
    }

    /// Builds the claim set for an age credential.
    ///
    /// # Returns
    /// `{"birthYear": <birth_year>, "country": <country or "USA">}`
    pub fn birth_year_claims(birth_year: i32, country: Option<String>) -> Map<String, Value> {
        let mut claims = Map::new();
        claims.insert("birthYear".to_string(), Value::from(birth_year));
        claims.insert(
            "country".to_string(),
            Value::from(country.unwrap_or_else(|| DEFAULT_COUNTRY.to_string())),
        );
        claims
    }

    /// Issues a signed credential about an existing user and stores it.
    ///
    /// # Arguments
    /// * `user_id` - Subject of the credential
    /// * `claim_data` - Key/value claims to sign
    ///
    /// # Returns
    /// The signed credential as handed to the holder
    ///
    /// # Errors
    /// `UserNotFound` if the subject does not exist; nothing is stored.
    pub fn issue_credential(
        &self,
        user_id: i64,
        claim_data: Map<String, Value>,
    ) -> ServiceResult<VerifiableCredential> {
        if self.store.user_by_id(user_id)?.is_none() {
            return Err(ServiceError::UserNotFound(user_id));
        }

        let credential = self.tokens.sign_credential(user_id, claim_data)?;
        let stored = self.store.insert_credential(NewCredential {
            owner_id: user_id,
            vc_data_json: serialize(&credential)?,
            issuer_did: credential.issuer_did.clone(),
        })?;

        log::info!("Issued credential {} to user {}", stored.id, user_id);
        Ok(credential)
    }

    /// Checks a presented credential against the issuer's secret.
    pub fn verify_credential(&self, credential: &VerifiableCredential) -> bool {
        self.tokens.verify_credential(credential)
    }

    /// Lists the credentials stored for a user, oldest first.
    ///
    /// # Errors
    /// `UserNotFound` if the user does not exist.
    pub fn credentials_for_user(&self, user_id: i64) -> ServiceResult<Vec<Credential>> {
        if self.store.user_by_id(user_id)?.is_none() {
            return Err(ServiceError::UserNotFound(user_id));
        }
        Ok(self.store.credentials_for_user(user_id)?)
    }

    /// Decodes the signed document kept in a stored credential row.
    pub fn open_stored(credential: &Credential) -> ServiceResult<VerifiableCredential> {
        Ok(deserialize(&credential.vc_data_json)?)
    }
}
