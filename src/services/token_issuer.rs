// src/services/token_issuer.rs
//! Bearer token and credential signing.
//!
//! Everything is HS256 under the one server-held secret from [`IssuerConfig`].
//! Neither bearer tokens nor credentials carry an expiry.

use crate::config::IssuerConfig;
use crate::errors::{ServiceError, ServiceResult};
use crate::models::credential::VerifiableCredential;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Which kind of principal a bearer token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Verifier,
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalKind::User => f.write_str("user"),
            PrincipalKind::Verifier => f.write_str("verifier"),
        }
    }
}

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Email for users, company name for verifiers
    pub sub: String,
    #[serde(rename = "type")]
    pub kind: PrincipalKind,
}

/// Login response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

/// Payload signed into a credential's `signature`.
#[derive(Debug, Serialize, Deserialize)]
struct CredentialClaims {
    /// Subject user id, as a string like any JWT `sub`
    sub: String,
    iss: String,
    iat: i64,
    claim: Map<String, Value>,
}

/// Signs and checks bearer tokens and verifiable credentials.
#[derive(Clone)]
pub struct TokenIssuer {
    config: IssuerConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(config: IssuerConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(&config.signing_secret);
        let decoding_key = DecodingKey::from_secret(&config.signing_secret);
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// HS256 without any registered-claim requirements: tokens have no `exp`.
    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation
    }

    /// Issues a bearer token for `subject` tagged with `kind`.
    pub fn issue_access_token(
        &self,
        subject: &str,
        kind: PrincipalKind,
    ) -> ServiceResult<AccessToken> {
        let claims = AccessClaims {
            sub: subject.to_string(),
            kind,
        };
        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(AccessToken {
            access_token,
            token_type: "bearer".to_string(),
        })
    }

    /// Verifies a bearer token's signature and that it was issued to a
    /// principal of the `expected` kind.
    ///
    /// # Errors
    /// `ServiceError::InvalidCredential` for a bad signature, malformed token
    /// or wrong principal kind.
    pub fn verify_access_token(
        &self,
        token: &str,
        expected: PrincipalKind,
    ) -> ServiceResult<AccessClaims> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &Self::validation())
            .map_err(|e| {
                log::debug!("Rejected bearer token: {}", e);
                ServiceError::InvalidCredential
            })?;

        if data.claims.kind != expected {
            log::debug!(
                "Bearer token kind {} used where {} was expected",
                data.claims.kind,
                expected
            );
            return Err(ServiceError::InvalidCredential);
        }
        Ok(data.claims)
    }

    /// Signs `claim_data` about `subject_id`, stamped with the current time.
    pub fn sign_credential(
        &self,
        subject_id: i64,
        claim_data: Map<String, Value>,
    ) -> ServiceResult<VerifiableCredential> {
        let claims = CredentialClaims {
            sub: subject_id.to_string(),
            iss: self.config.issuer_did.clone(),
            iat: Utc::now().timestamp(),
            claim: claim_data,
        };
        let signature = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(VerifiableCredential {
            issuer_did: claims.iss,
            subject_id,
            claim_data: claims.claim,
            signature,
        })
    }

    /// Returns `true` if the credential's signature is ours and the signed
    /// issuer, subject and claims match the document's visible fields.
    pub fn verify_credential(&self, credential: &VerifiableCredential) -> bool {
        match decode::<CredentialClaims>(
            &credential.signature,
            &self.decoding_key,
            &Self::validation(),
        ) {
            Ok(data) => {
                data.claims.iss == credential.issuer_did
                    && data.claims.iss == self.config.issuer_did
                    && data.claims.sub == credential.subject_id.to_string()
                    && data.claims.claim == credential.claim_data
            }
            Err(e) => {
                log::debug!("Credential signature rejected: {}", e);
                false
            }
        }
    }
}
