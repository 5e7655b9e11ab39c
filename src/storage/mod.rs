// src/storage/mod.rs
//! Persistence boundary.
//!
//! The services talk to storage only through [`Store`]. Every call is one unit
//! of work: it either commits fully or returns an error without side effects.
//! Implementations enforce uniqueness of `email`, `company_name` and `api_key`
//! and the foreign keys from requests and credentials to their owners.

pub mod memory;

use crate::errors::StorageError;
use crate::models::credential::{Credential, NewCredential};
use crate::models::user::{NewUser, User};
use crate::models::verification_request::{NewVerificationRequest, VerificationRequest};
use crate::models::verifier::{NewVerifier, Verifier};

pub use memory::InMemoryStore;

pub type StorageResult<T> = Result<T, StorageError>;

pub trait Store: Send + Sync {
    // Users

    fn insert_user(&self, user: NewUser) -> StorageResult<User>;

    fn user_by_id(&self, id: i64) -> StorageResult<Option<User>>;

    fn user_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    // Verifiers

    /// Inserts an active verifier.
    fn insert_verifier(&self, verifier: NewVerifier) -> StorageResult<Verifier>;

    fn verifier_by_id(&self, id: i64) -> StorageResult<Option<Verifier>>;

    fn verifier_by_company_name(&self, company_name: &str) -> StorageResult<Option<Verifier>>;

    fn verifier_by_api_key(&self, api_key: &str) -> StorageResult<Option<Verifier>>;

    /// Flips the active flag. Returns `None` if the verifier does not exist.
    fn set_verifier_active(&self, id: i64, is_active: bool) -> StorageResult<Option<Verifier>>;

    // Credentials

    fn insert_credential(&self, credential: NewCredential) -> StorageResult<Credential>;

    fn credentials_for_user(&self, owner_id: i64) -> StorageResult<Vec<Credential>>;

    // Verification requests

    /// Inserts a request with status `pending` and no result.
    fn insert_verification_request(
        &self,
        request: NewVerificationRequest,
    ) -> StorageResult<VerificationRequest>;

    fn verification_request_by_id(&self, id: i64) -> StorageResult<Option<VerificationRequest>>;

    /// Applies `apply` to the stored request and stamps `updated_at`, all
    /// under one lock. Returns `None` if no request has that id.
    fn update_verification_request(
        &self,
        id: i64,
        apply: &mut dyn FnMut(&mut VerificationRequest),
    ) -> StorageResult<Option<VerificationRequest>>;

    /// Requests whose subject is `user_id`, optionally filtered by status,
    /// in insertion order.
    fn requests_for_user(
        &self,
        user_id: i64,
        status: Option<&str>,
    ) -> StorageResult<Vec<VerificationRequest>>;

    /// Requests opened by `verifier_id`, newest first (ties by id, newest first).
    fn requests_for_verifier(&self, verifier_id: i64) -> StorageResult<Vec<VerificationRequest>>;
}
