// src/services/auth.rs
//! Principal authentication.
//!
//! Three ways in:
//! - API key (verifiers, on every verifier-scoped call)
//! - identifier + password (users by email, verifiers by company name),
//!   answered with a bearer token
//! - bearer token, checked against the expected principal kind
//!
//! Every failure mode within one path collapses into a single error so callers
//! cannot probe which identifiers or keys exist.

use crate::errors::{ServiceError, ServiceResult};
use crate::models::user::User;
use crate::models::verifier::Verifier;
use crate::services::token_issuer::{AccessToken, PrincipalKind, TokenIssuer};
use crate::storage::Store;
use crate::utils::crypto::PasswordHasher;
use std::sync::Arc;

#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn Store>,
    hasher: PasswordHasher,
    tokens: Arc<TokenIssuer>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn Store>, hasher: PasswordHasher, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// Resolves an API key to an active verifier.
    ///
    /// # Errors
    /// - `MissingCredential` if no key was presented
    /// - `InvalidCredential` if the key is unknown or the verifier is
    ///   inactive; the two cases are not distinguished
    pub fn authenticate_api_key(&self, api_key: Option<&str>) -> ServiceResult<Verifier> {
        let api_key = api_key.ok_or(ServiceError::MissingCredential)?;

        match self.store.verifier_by_api_key(api_key)? {
            Some(verifier) if verifier.is_active => Ok(verifier),
            _ => {
                log::warn!("Rejected API key authentication");
                Err(ServiceError::InvalidCredential)
            }
        }
    }

    /// Password login for users, keyed by email.
    pub fn login_user(&self, email: &str, password: &str) -> ServiceResult<AccessToken> {
        let user = self.store.user_by_email(email)?;
        let hash = user.as_ref().map(|u| u.hashed_password.as_str());
        if !self.check_password(password, hash) {
            log::warn!("Failed user login");
            return Err(ServiceError::InvalidCredentials);
        }
        self.tokens.issue_access_token(email, PrincipalKind::User)
    }

    /// Password login for verifiers, keyed by company name.
    pub fn login_verifier(&self, company_name: &str, password: &str) -> ServiceResult<AccessToken> {
        let verifier = self.store.verifier_by_company_name(company_name)?;
        let hash = verifier.as_ref().map(|v| v.hashed_password.as_str());
        if !self.check_password(password, hash) {
            log::warn!("Failed verifier login");
            return Err(ServiceError::InvalidCredentials);
        }
        self.tokens
            .issue_access_token(company_name, PrincipalKind::Verifier)
    }

    fn check_password(&self, password: &str, stored: Option<&str>) -> bool {
        match stored {
            Some(stored) => self.hasher.verify(password, stored),
            None => self.hasher.verify_absent(password),
        }
    }

    /// Resolves a user bearer token to the user it names.
    ///
    /// # Errors
    /// `InvalidCredential` if the token is invalid, was issued to a verifier,
    /// or names a user that no longer resolves.
    pub fn user_from_token(&self, token: &str) -> ServiceResult<User> {
        let claims = self.tokens.verify_access_token(token, PrincipalKind::User)?;
        self.store
            .user_by_email(&claims.sub)?
            .ok_or(ServiceError::InvalidCredential)
    }

    /// Resolves a verifier bearer token to the verifier it names.
    pub fn verifier_from_token(&self, token: &str) -> ServiceResult<Verifier> {
        let claims = self
            .tokens
            .verify_access_token(token, PrincipalKind::Verifier)?;
        self.store
            .verifier_by_company_name(&claims.sub)?
            .ok_or(ServiceError::InvalidCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IssuerConfig;
    use crate::models::user::NewUser;
    use crate::models::verifier::NewVerifier;
    use crate::storage::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        auth: Authenticator,
        hasher: PasswordHasher,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let hasher = PasswordHasher::new(1_000).unwrap();
        let tokens = Arc::new(TokenIssuer::new(IssuerConfig::new(
            "test-secret",
            "did:example:issuer",
        )));
        let auth = Authenticator::new(store.clone(), hasher.clone(), tokens);
        Fixture {
            store,
            auth,
            hasher,
        }
    }

    fn add_verifier(f: &Fixture, name: &str, api_key: &str) -> Verifier {
        f.store
            .insert_verifier(NewVerifier {
                company_name: name.into(),
                hashed_password: f.hasher.hash("verifier-pw").unwrap(),
                api_key: api_key.into(),
                webhook_url: None,
            })
            .unwrap()
    }

    #[test]
    fn test_missing_api_key() {
        let f = fixture();
        assert!(matches!(
            f.auth.authenticate_api_key(None),
            Err(ServiceError::MissingCredential)
        ));
    }

    #[test]
    fn test_valid_api_key_resolves_verifier() {
        let f = fixture();
        let verifier = add_verifier(&f, "Acme", "key-1");

        let resolved = f.auth.authenticate_api_key(Some("key-1")).unwrap();
        assert_eq!(resolved, verifier);
    }

    #[test]
    fn test_inactive_and_unknown_keys_fail_alike() {
        let f = fixture();
        let verifier = add_verifier(&f, "Acme", "key-1");
        f.store.set_verifier_active(verifier.id, false).unwrap();

        let inactive = f.auth.authenticate_api_key(Some("key-1")).unwrap_err();
        let unknown = f.auth.authenticate_api_key(Some("key-2")).unwrap_err();

        assert!(matches!(inactive, ServiceError::InvalidCredential));
        assert!(matches!(unknown, ServiceError::InvalidCredential));
        assert_eq!(inactive.to_string(), unknown.to_string());
    }

    #[test]
    fn test_user_login() {
        let f = fixture();
        f.store
            .insert_user(NewUser {
                email: "a@example.com".into(),
                hashed_password: f.hasher.hash("user-pw").unwrap(),
                did: None,
            })
            .unwrap();

        let token = f.auth.login_user("a@example.com", "user-pw").unwrap();
        let user = f.auth.user_from_token(&token.access_token).unwrap();
        assert_eq!(user.email, "a@example.com");

        // Wrong password and unknown email are the same failure
        let wrong = f.auth.login_user("a@example.com", "nope").unwrap_err();
        let unknown = f.auth.login_user("b@example.com", "user-pw").unwrap_err();
        assert!(matches!(wrong, ServiceError::InvalidCredentials));
        assert!(matches!(unknown, ServiceError::InvalidCredentials));
    }

    #[test]
    fn test_verifier_login_token_is_verifier_scoped() {
        let f = fixture();
        add_verifier(&f, "Acme", "key-1");

        let token = f.auth.login_verifier("Acme", "verifier-pw").unwrap();
        assert_eq!(
            f.auth
                .verifier_from_token(&token.access_token)
                .unwrap()
                .company_name,
            "Acme"
        );
        assert!(matches!(
            f.auth.user_from_token(&token.access_token),
            Err(ServiceError::InvalidCredential)
        ));
        assert!(matches!(
            f.auth.login_verifier("Acme", "user-pw"),
            Err(ServiceError::InvalidCredentials)
        ));
    }
}
