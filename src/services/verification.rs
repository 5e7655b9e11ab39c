// src/services/verification.rs
//! Verification request lifecycle.
//!
//! A request is opened by an authenticated verifier against an existing user
//! and starts `pending`. The status update overwrites status and result as
//! given and only replaces the etherscan URL when a non-empty one is supplied.
//!
//! Transitions are not guarded: any status string is accepted and
//! `completed`/`failed` requests can be moved again. Concurrent updates to the
//! same request are last-writer-wins.

use crate::errors::{ServiceError, ServiceResult, StorageError};
use crate::models::user::UserSummary;
use crate::models::verification_request::{
    NewVerificationRequest, StatusUpdate, VerificationRequest, VerificationRequestWithRelations,
    STATUS_COMPLETED, STATUS_FAILED, STATUS_PENDING,
};
use crate::models::verifier::{Verifier, VerifierSummary};
use crate::storage::Store;
use std::collections::HashMap;
use std::sync::Arc;

/// Creates, transitions and lists verification requests.
#[derive(Clone)]
pub struct VerificationLifecycle {
    store: Arc<dyn Store>,
}

impl VerificationLifecycle {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Opens a `pending` request from `verifier` about `user_id`.
    ///
    /// # Arguments
    /// * `verifier` - Principal already resolved from its API key
    /// * `user_id` - Subject of the request
    /// * `policy` - Opaque predicate name, not validated
    ///
    /// # Errors
    /// `UserNotFound` if the subject does not exist; nothing is persisted.
    pub fn create_request(
        &self,
        verifier: &Verifier,
        user_id: i64,
        policy: &str,
    ) -> ServiceResult<VerificationRequest> {
        if self.store.user_by_id(user_id)?.is_none() {
            return Err(ServiceError::UserNotFound(user_id));
        }

        let request = self.store.insert_verification_request(NewVerificationRequest {
            verifier_id: verifier.id,
            user_id,
            policy_to_check: policy.to_string(),
        })?;

        log::info!(
            "Verifier {} opened request {} for user {} ({})",
            verifier.id,
            request.id,
            user_id,
            policy
        );
        Ok(request)
    }

    /// Applies a status update to a request.
    ///
    /// # Returns
    /// - `Ok(Some(request))` with the updated record
    /// - `Ok(None)` if no request has that id
    pub fn update(
        &self,
        request_id: i64,
        update: StatusUpdate,
    ) -> ServiceResult<Option<VerificationRequest>> {
        let StatusUpdate {
            status,
            result,
            etherscan_url,
        } = update;

        let updated = self
            .store
            .update_verification_request(request_id, &mut |request: &mut VerificationRequest| {
                request.status = status.clone();
                request.result = result.clone();
                if let Some(url) = etherscan_url.as_ref().filter(|url| !url.is_empty()) {
                    request.etherscan_url = Some(url.clone());
                }
            })?;

        match &updated {
            Some(request) => match request.status.as_str() {
                STATUS_PENDING | STATUS_COMPLETED | STATUS_FAILED => log::info!(
                    "Request {} is now {} (result={:?})",
                    request.id,
                    request.status,
                    request.result
                ),
                other => log::warn!("Request {} moved to non-standard status {:?}", request.id, other),
            },
            None => log::warn!("Could not find request {} to update", request_id),
        }
        Ok(updated)
    }

    pub fn get(&self, request_id: i64) -> ServiceResult<Option<VerificationRequest>> {
        Ok(self.store.verification_request_by_id(request_id)?)
    }

    /// Pending requests about a user, oldest first.
    ///
    /// # Errors
    /// `UserNotFound` if the user does not exist.
    pub fn pending_for_user(&self, user_id: i64) -> ServiceResult<Vec<VerificationRequestWithRelations>> {
        if self.store.user_by_id(user_id)?.is_none() {
            return Err(ServiceError::UserNotFound(user_id));
        }
        let requests = self.store.requests_for_user(user_id, Some(STATUS_PENDING))?;
        self.with_relations(requests)
    }

    /// Every request opened by a verifier, newest first.
    pub fn history_for_verifier(
        &self,
        verifier_id: i64,
    ) -> ServiceResult<Vec<VerificationRequestWithRelations>> {
        let requests = self.store.requests_for_verifier(verifier_id)?;
        self.with_relations(requests)
    }

    /// Attaches user and verifier summaries, looking each id up once.
    fn with_relations(
        &self,
        requests: Vec<VerificationRequest>,
    ) -> ServiceResult<Vec<VerificationRequestWithRelations>> {
        let mut users: HashMap<i64, UserSummary> = HashMap::new();
        let mut verifiers: HashMap<i64, VerifierSummary> = HashMap::new();
        let mut shaped = Vec::with_capacity(requests.len());

        for request in requests {
            let user = match users.get(&request.user_id).cloned() {
                Some(user) => user,
                None => {
                    let user = self
                        .store
                        .user_by_id(request.user_id)?
                        .ok_or(ServiceError::UserNotFound(request.user_id))?;
                    let summary = UserSummary::from(&user);
                    users.insert(user.id, summary.clone());
                    summary
                }
            };
            let verifier = match verifiers.get(&request.verifier_id).cloned() {
                Some(verifier) => verifier,
                None => {
                    let verifier = self.store.verifier_by_id(request.verifier_id)?.ok_or_else(|| {
                        ServiceError::Storage(StorageError::ForeignKeyViolation {
                            field: "verifier_id",
                        })
                    })?;
                    let summary = VerifierSummary::from(&verifier);
                    verifiers.insert(verifier.id, summary.clone());
                    summary
                }
            };
            shaped.push(VerificationRequestWithRelations {
                request,
                user,
                verifier,
            });
        }
        Ok(shaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::NewUser;
    use crate::models::verifier::NewVerifier;
    use crate::storage::InMemoryStore;
    use tokio_test::assert_ok;

    struct Fixture {
        lifecycle: VerificationLifecycle,
        verifier: Verifier,
        user_id: i64,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let user = store
            .insert_user(NewUser {
                email: "a@example.com".into(),
                hashed_password: "hash".into(),
                did: None,
            })
            .unwrap();
        let verifier = store
            .insert_verifier(NewVerifier {
                company_name: "Acme".into(),
                hashed_password: "hash".into(),
                api_key: "key-1".into(),
                webhook_url: None,
            })
            .unwrap();
        Fixture {
            lifecycle: VerificationLifecycle::new(store),
            verifier,
            user_id: user.id,
        }
    }

    fn update(status: &str, result: Option<&str>, url: Option<&str>) -> StatusUpdate {
        StatusUpdate {
            status: status.to_string(),
            result: result.map(String::from),
            etherscan_url: url.map(String::from),
        }
    }

    #[test]
    fn test_create_starts_pending_with_no_result() {
        let f = fixture();
        let request = assert_ok!(f.lifecycle.create_request(&f.verifier, f.user_id, "isOver18"));

        assert_eq!(request.status, "pending");
        assert_eq!(request.result, None);
        assert_eq!(request.etherscan_url, None);
        assert_eq!(request.updated_at, None);
        assert_eq!(request.verifier_id, f.verifier.id);
        assert_eq!(request.policy_to_check, "isOver18");
    }

    #[test]
    fn test_create_for_unknown_user_persists_nothing() {
        let f = fixture();
        let err = f
            .lifecycle
            .create_request(&f.verifier, 999, "isOver18")
            .unwrap_err();

        assert!(matches!(err, ServiceError::UserNotFound(999)));
        assert!(f.lifecycle.history_for_verifier(f.verifier.id).unwrap().is_empty());
    }

    #[test]
    fn test_empty_etherscan_url_keeps_previous() {
        let f = fixture();
        let request = f.lifecycle.create_request(&f.verifier, f.user_id, "isOver18").unwrap();

        f.lifecycle
            .update(request.id, update(STATUS_COMPLETED, Some("Yes"), Some("https://sepolia.etherscan.io/tx/0xabc")))
            .unwrap();
        let updated = f
            .lifecycle
            .update(request.id, update(STATUS_COMPLETED, Some("Yes"), Some("")))
            .unwrap()
            .unwrap();
        assert_eq!(
            updated.etherscan_url.as_deref(),
            Some("https://sepolia.etherscan.io/tx/0xabc")
        );

        let updated = f
            .lifecycle
            .update(request.id, update(STATUS_COMPLETED, Some("Yes"), None))
            .unwrap()
            .unwrap();
        assert_eq!(
            updated.etherscan_url.as_deref(),
            Some("https://sepolia.etherscan.io/tx/0xabc")
        );
    }

    #[test]
    fn test_omitted_result_clears_it() {
        let f = fixture();
        let request = f.lifecycle.create_request(&f.verifier, f.user_id, "isOver18").unwrap();
        f.lifecycle
            .update(request.id, update(STATUS_COMPLETED, Some("Yes"), None))
            .unwrap();

        let updated = f
            .lifecycle
            .update(request.id, update(STATUS_FAILED, None, None))
            .unwrap()
            .unwrap();
        assert_eq!(updated.result, None);
        assert!(updated.updated_at.is_some());
    }

    #[test]
    fn test_update_missing_request_is_none() {
        let f = fixture();
        assert_eq!(
            f.lifecycle.update(42, update(STATUS_COMPLETED, Some("Yes"), None)).unwrap(),
            None
        );
    }

    #[test]
    fn test_terminal_states_can_be_left_again() {
        let f = fixture();
        let request = f.lifecycle.create_request(&f.verifier, f.user_id, "isOver18").unwrap();

        let first = f
            .lifecycle
            .update(request.id, update(STATUS_COMPLETED, Some("Yes"), None))
            .unwrap()
            .unwrap();
        assert_eq!(first.status, "completed");

        let second = f
            .lifecycle
            .update(request.id, update(STATUS_FAILED, Some("No"), None))
            .unwrap()
            .unwrap();
        assert_eq!(second.status, "failed");

        // Non-canonical values are stored as given
        let third = f
            .lifecycle
            .update(request.id, update("escalated", None, None))
            .unwrap()
            .unwrap();
        assert_eq!(third.status, "escalated");
        assert_eq!(f.lifecycle.get(request.id).unwrap(), Some(third));
    }

    #[test]
    fn test_pending_for_user_filters_status() {
        let f = fixture();
        let done = f.lifecycle.create_request(&f.verifier, f.user_id, "isOver18").unwrap();
        let open = f.lifecycle.create_request(&f.verifier, f.user_id, "isResident").unwrap();
        f.lifecycle
            .update(done.id, update(STATUS_COMPLETED, Some("Yes"), None))
            .unwrap();

        let pending = f.lifecycle.pending_for_user(f.user_id).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request.id, open.id);
        assert_eq!(pending[0].user.email, "a@example.com");
        assert_eq!(pending[0].verifier.company_name, "Acme");

        assert!(matches!(
            f.lifecycle.pending_for_user(77),
            Err(ServiceError::UserNotFound(77))
        ));
    }

    #[test]
    fn test_history_is_newest_first_with_relations() {
        let f = fixture();
        let older = f.lifecycle.create_request(&f.verifier, f.user_id, "isOver18").unwrap();
        let newer = f.lifecycle.create_request(&f.verifier, f.user_id, "isResident").unwrap();

        let history = f.lifecycle.history_for_verifier(f.verifier.id).unwrap();
        let ids: Vec<i64> = history.iter().map(|r| r.request.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert!(history.iter().all(|r| r.verifier.id == f.verifier.id));

        let json = serde_json::to_value(&history[0]).unwrap();
        assert_eq!(json["policy_to_check"], "isResident");
        assert_eq!(json["user"]["email"], "a@example.com");
        assert_eq!(json["verifier"]["company_name"], "Acme");
    }
}
