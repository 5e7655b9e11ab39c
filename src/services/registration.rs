// src/services/registration.rs
//! User and verifier sign-up, plus lookups by login identifier.

use crate::errors::{ServiceError, ServiceResult};
use crate::models::user::{NewUser, User, UserView};
use crate::models::verification_request::RequestSummary;
use crate::models::verifier::{NewVerifier, Verifier, VerifierView};
use crate::storage::Store;
use crate::utils::crypto::PasswordHasher;
use std::sync::Arc;

#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn Store>,
    hasher: PasswordHasher,
}

impl Registry {
    pub fn new(store: Arc<dyn Store>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// Registers a user with a hashed password and a fresh DID.
    ///
    /// # Errors
    /// - `InvalidInput` if the email is malformed or the password empty
    /// - `DuplicateIdentifier` if the email is already registered
    pub fn register_user(&self, email: &str, password: &str) -> ServiceResult<User> {
        validate_email(email)?;
        validate_password(password)?;
        if self.store.user_by_email(email)?.is_some() {
            return Err(ServiceError::DuplicateIdentifier("email"));
        }
        let hashed_password = self.hasher.hash(password)?;
        // The store enforces the same constraint for concurrent sign-ups
        let user = self
            .store
            .insert_user(NewUser::with_generated_did(email.to_string(), hashed_password))?;

        log::info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Registers an active verifier with a hashed password and a fresh API key.
    ///
    /// # Errors
    /// `DuplicateIdentifier` if the company name is already registered.
    pub fn register_verifier(
        &self,
        company_name: &str,
        password: &str,
        webhook_url: Option<String>,
    ) -> ServiceResult<Verifier> {
        if company_name.trim().is_empty() {
            return Err(ServiceError::InvalidInput("company name must not be empty".into()));
        }
        validate_password(password)?;
        if self.store.verifier_by_company_name(company_name)?.is_some() {
            return Err(ServiceError::DuplicateIdentifier("company name"));
        }
        let hashed_password = self.hasher.hash(password)?;
        let verifier = self.store.insert_verifier(NewVerifier::with_generated_api_key(
            company_name.to_string(),
            hashed_password,
            webhook_url,
        ))?;

        log::info!("Registered verifier {} ({})", verifier.id, verifier.company_name);
        Ok(verifier)
    }

    pub fn user_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(self.store.user_by_email(email)?)
    }

    pub fn verifier_by_company_name(&self, company_name: &str) -> ServiceResult<Option<Verifier>> {
        Ok(self.store.verifier_by_company_name(company_name)?)
    }

    /// Activates or deactivates a verifier. Returns `None` if it does not exist.
    pub fn set_verifier_active(&self, id: i64, is_active: bool) -> ServiceResult<Option<Verifier>> {
        let verifier = self.store.set_verifier_active(id, is_active)?;
        if verifier.is_some() {
            log::info!("Verifier {} active={}", id, is_active);
        }
        Ok(verifier)
    }

    /// Shapes a user for a response, attaching every request about them.
    pub fn user_view(&self, user: &User) -> ServiceResult<UserView> {
        let requests = self.store.requests_for_user(user.id, None)?;
        Ok(UserView::new(
            user,
            requests.iter().map(RequestSummary::from).collect(),
        ))
    }

    /// Shapes a verifier for a response, attaching every request it opened.
    pub fn verifier_view(&self, verifier: &Verifier) -> ServiceResult<VerifierView> {
        let requests = self.store.requests_for_verifier(verifier.id)?;
        Ok(VerifierView::new(
            verifier,
            requests.iter().map(RequestSummary::from).collect(),
        ))
    }
}

/// Accepts `local@domain` with a dot somewhere in the domain and no spaces.
fn validate_email(email: &str) -> ServiceResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!("'{}' is not a valid email address", email)))
    }
}

fn validate_password(password: &str) -> ServiceResult<()> {
    if password.is_empty() {
        return Err(ServiceError::InvalidInput("password must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use tokio_test::{assert_err, assert_ok};

    fn registry() -> Registry {
        Registry::new(
            Arc::new(InMemoryStore::new()),
            PasswordHasher::new(1_000).unwrap(),
        )
    }

    #[test]
    fn test_register_user_hashes_password() {
        let registry = registry();
        let user = assert_ok!(registry.register_user("a@example.com", "pw"));

        assert_ne!(user.hashed_password, "pw");
        assert!(user.did.as_deref().unwrap().starts_with("did:example:"));
        assert_eq!(
            registry.user_by_email("a@example.com").unwrap(),
            Some(user)
        );
    }

    #[test]
    fn test_duplicate_email_is_rejected_without_new_row() {
        let registry = registry();
        let first = assert_ok!(registry.register_user("a@example.com", "pw"));

        let err = assert_err!(registry.register_user("a@example.com", "other"));
        assert!(matches!(err, ServiceError::DuplicateIdentifier("email")));

        // Original row is untouched
        assert_eq!(registry.user_by_email("a@example.com").unwrap(), Some(first));
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        let registry = registry();
        for email in ["", "no-at-sign", "@example.com", "a@localhost", "a b@example.com", "a@example.com."] {
            assert!(
                matches!(registry.register_user(email, "pw"), Err(ServiceError::InvalidInput(_))),
                "accepted {:?}",
                email
            );
        }
        assert!(matches!(
            registry.register_user("a@example.com", ""),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            registry.register_verifier("  ", "pw", None),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(registry.user_by_email("a@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_company_name_is_rejected() {
        let registry = registry();
        assert_ok!(registry.register_verifier("Acme", "pw", None));

        let err = assert_err!(registry.register_verifier("Acme", "pw", None));
        assert!(matches!(err, ServiceError::DuplicateIdentifier("company name")));
    }

    #[test]
    fn test_api_keys_are_unique() {
        let registry = registry();
        let keys: std::collections::HashSet<String> = (0..20)
            .map(|i| {
                registry
                    .register_verifier(&format!("Company {}", i), "pw", None)
                    .unwrap()
                    .api_key
            })
            .collect();
        assert_eq!(keys.len(), 20);
    }

    #[test]
    fn test_new_verifier_is_active_with_webhook() {
        let registry = registry();
        let verifier = assert_ok!(registry.register_verifier(
            "Acme",
            "pw",
            Some("https://acme.example/hook".into())
        ));
        assert!(verifier.is_active);
        assert_eq!(verifier.webhook_url.as_deref(), Some("https://acme.example/hook"));

        let view = registry.verifier_view(&verifier).unwrap();
        assert_eq!(view.api_key, verifier.api_key);
        assert!(view.verification_requests.is_empty());

        let deactivated = registry.set_verifier_active(verifier.id, false).unwrap().unwrap();
        assert!(!deactivated.is_active);
        assert!(registry.set_verifier_active(99, false).unwrap().is_none());
    }
}
