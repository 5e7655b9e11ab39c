// src/storage/memory.rs
//! In-memory implementation of the persistence boundary.
//!
//! All tables live behind a single mutex, so each [`Store`] call observes and
//! commits a consistent snapshot. Rows are keyed by auto-incremented integer
//! ids held in ordered maps, which keeps listings in insertion order.
//!
//! # Note
//! Data does not survive a restart.

use crate::errors::StorageError;
use crate::models::credential::{Credential, NewCredential};
use crate::models::user::{NewUser, User};
use crate::models::verification_request::{
    NewVerificationRequest, VerificationRequest, STATUS_PENDING,
};
use crate::models::verifier::{NewVerifier, Verifier};
use crate::storage::{StorageResult, Store};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Row storage for one entity type with its id sequence.
struct Table<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T> Table<T> {
    fn new() -> Self {
        Table {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }

    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

struct Tables {
    users: Table<User>,
    verifiers: Table<Verifier>,
    credentials: Table<Credential>,
    requests: Table<VerificationRequest>,
}

/// Thread-safe in-memory store.
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        InMemoryStore {
            tables: Mutex::new(Tables {
                users: Table::new(),
                verifiers: Table::new(),
                credentials: Table::new(),
                requests: Table::new(),
            }),
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".into()))
    }
}

impl Store for InMemoryStore {
    fn insert_user(&self, user: NewUser) -> StorageResult<User> {
        let mut tables = self.lock()?;
        let users = &mut tables.users;

        if users.rows.values().any(|u| u.email == user.email) {
            return Err(StorageError::UniqueViolation { field: "email" });
        }
        if let Some(did) = &user.did {
            if users.rows.values().any(|u| u.did.as_ref() == Some(did)) {
                return Err(StorageError::UniqueViolation { field: "did" });
            }
        }

        let row = User {
            id: users.next_id(),
            email: user.email,
            hashed_password: user.hashed_password,
            did: user.did,
            created_at: Utc::now(),
        };
        users.rows.insert(row.id, row.clone());
        Ok(row)
    }

    fn user_by_id(&self, id: i64) -> StorageResult<Option<User>> {
        Ok(self.lock()?.users.rows.get(&id).cloned())
    }

    fn user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .rows
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    fn insert_verifier(&self, verifier: NewVerifier) -> StorageResult<Verifier> {
        let mut tables = self.lock()?;
        let verifiers = &mut tables.verifiers;

        if verifiers
            .rows
            .values()
            .any(|v| v.company_name == verifier.company_name)
        {
            return Err(StorageError::UniqueViolation {
                field: "company_name",
            });
        }
        if verifiers.rows.values().any(|v| v.api_key == verifier.api_key) {
            return Err(StorageError::UniqueViolation { field: "api_key" });
        }

        let row = Verifier {
            id: verifiers.next_id(),
            company_name: verifier.company_name,
            hashed_password: verifier.hashed_password,
            api_key: verifier.api_key,
            webhook_url: verifier.webhook_url,
            is_active: true,
            created_at: Utc::now(),
        };
        verifiers.rows.insert(row.id, row.clone());
        Ok(row)
    }

    fn verifier_by_id(&self, id: i64) -> StorageResult<Option<Verifier>> {
        Ok(self.lock()?.verifiers.rows.get(&id).cloned())
    }

    fn verifier_by_company_name(&self, company_name: &str) -> StorageResult<Option<Verifier>> {
        Ok(self
            .lock()?
            .verifiers
            .rows
            .values()
            .find(|v| v.company_name == company_name)
            .cloned())
    }

    fn verifier_by_api_key(&self, api_key: &str) -> StorageResult<Option<Verifier>> {
        Ok(self
            .lock()?
            .verifiers
            .rows
            .values()
            .find(|v| v.api_key == api_key)
            .cloned())
    }

    fn set_verifier_active(&self, id: i64, is_active: bool) -> StorageResult<Option<Verifier>> {
        let mut tables = self.lock()?;
        Ok(tables.verifiers.rows.get_mut(&id).map(|verifier| {
            verifier.is_active = is_active;
            verifier.clone()
        }))
    }

    fn insert_credential(&self, credential: NewCredential) -> StorageResult<Credential> {
        let mut tables = self.lock()?;
        if !tables.users.rows.contains_key(&credential.owner_id) {
            return Err(StorageError::ForeignKeyViolation { field: "owner_id" });
        }

        let credentials = &mut tables.credentials;
        let row = Credential {
            id: credentials.next_id(),
            owner_id: credential.owner_id,
            vc_data_json: credential.vc_data_json,
            issuer_did: credential.issuer_did,
            issued_at: Utc::now(),
        };
        credentials.rows.insert(row.id, row.clone());
        Ok(row)
    }

    fn credentials_for_user(&self, owner_id: i64) -> StorageResult<Vec<Credential>> {
        Ok(self
            .lock()?
            .credentials
            .rows
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn insert_verification_request(
        &self,
        request: NewVerificationRequest,
    ) -> StorageResult<VerificationRequest> {
        let mut tables = self.lock()?;
        if !tables.users.rows.contains_key(&request.user_id) {
            return Err(StorageError::ForeignKeyViolation { field: "user_id" });
        }
        if !tables.verifiers.rows.contains_key(&request.verifier_id) {
            return Err(StorageError::ForeignKeyViolation {
                field: "verifier_id",
            });
        }

        let requests = &mut tables.requests;
        let row = VerificationRequest {
            id: requests.next_id(),
            verifier_id: request.verifier_id,
            user_id: request.user_id,
            policy_to_check: request.policy_to_check,
            status: STATUS_PENDING.to_string(),
            result: None,
            etherscan_url: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        requests.rows.insert(row.id, row.clone());
        Ok(row)
    }

    fn verification_request_by_id(&self, id: i64) -> StorageResult<Option<VerificationRequest>> {
        Ok(self.lock()?.requests.rows.get(&id).cloned())
    }

    fn update_verification_request(
        &self,
        id: i64,
        apply: &mut dyn FnMut(&mut VerificationRequest),
    ) -> StorageResult<Option<VerificationRequest>> {
        let mut tables = self.lock()?;
        Ok(tables.requests.rows.get_mut(&id).map(|request| {
            apply(request);
            request.updated_at = Some(Utc::now());
            request.clone()
        }))
    }

    fn requests_for_user(
        &self,
        user_id: i64,
        status: Option<&str>,
    ) -> StorageResult<Vec<VerificationRequest>> {
        Ok(self
            .lock()?
            .requests
            .rows
            .values()
            .filter(|r| r.user_id == user_id)
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }

    fn requests_for_verifier(&self, verifier_id: i64) -> StorageResult<Vec<VerificationRequest>> {
        let mut requests: Vec<VerificationRequest> = self
            .lock()?
            .requests
            .rows
            .values()
            .filter(|r| r.verifier_id == verifier_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            hashed_password: "hash".to_string(),
            did: None,
        }
    }

    fn new_verifier(name: &str, api_key: &str) -> NewVerifier {
        NewVerifier {
            company_name: name.to_string(),
            hashed_password: "hash".to_string(),
            api_key: api_key.to_string(),
            webhook_url: None,
        }
    }

    #[test]
    fn test_ids_are_sequential_per_table() {
        let store = InMemoryStore::new();
        let a = store.insert_user(new_user("a@example.com")).unwrap();
        let b = store.insert_user(new_user("b@example.com")).unwrap();
        let v = store.insert_verifier(new_verifier("Acme", "k1")).unwrap();

        assert_eq!((a.id, b.id, v.id), (1, 2, 1));
        assert!(v.is_active);
    }

    #[test]
    fn test_unique_constraints() {
        let store = InMemoryStore::new();
        store.insert_user(new_user("a@example.com")).unwrap();
        assert_eq!(
            store.insert_user(new_user("a@example.com")),
            Err(StorageError::UniqueViolation { field: "email" })
        );

        store.insert_verifier(new_verifier("Acme", "k1")).unwrap();
        assert_eq!(
            store.insert_verifier(new_verifier("Acme", "k2")).unwrap_err(),
            StorageError::UniqueViolation { field: "company_name" }
        );
        assert_eq!(
            store.insert_verifier(new_verifier("Globex", "k1")).unwrap_err(),
            StorageError::UniqueViolation { field: "api_key" }
        );
    }

    #[test]
    fn test_request_foreign_keys() {
        let store = InMemoryStore::new();
        let user = store.insert_user(new_user("a@example.com")).unwrap();

        let err = store
            .insert_verification_request(NewVerificationRequest {
                verifier_id: 9,
                user_id: user.id,
                policy_to_check: "isOver18".into(),
            })
            .unwrap_err();
        assert_eq!(err, StorageError::ForeignKeyViolation { field: "verifier_id" });
        assert!(store.requests_for_user(user.id, None).unwrap().is_empty());
    }

    #[test]
    fn test_update_stamps_updated_at() {
        let store = InMemoryStore::new();
        let user = store.insert_user(new_user("a@example.com")).unwrap();
        let verifier = store.insert_verifier(new_verifier("Acme", "k1")).unwrap();
        let request = store
            .insert_verification_request(NewVerificationRequest {
                verifier_id: verifier.id,
                user_id: user.id,
                policy_to_check: "isOver18".into(),
            })
            .unwrap();
        assert_eq!(request.updated_at, None);

        let updated = store
            .update_verification_request(request.id, &mut |r: &mut VerificationRequest| r.status = "failed".into())
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, "failed");
        assert!(updated.updated_at.is_some());

        assert!(store
            .update_verification_request(99, &mut |_: &mut VerificationRequest| {})
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_verifier_history_is_newest_first() {
        let store = InMemoryStore::new();
        let user = store.insert_user(new_user("a@example.com")).unwrap();
        let verifier = store.insert_verifier(new_verifier("Acme", "k1")).unwrap();
        for policy in ["first", "second", "third"] {
            store
                .insert_verification_request(NewVerificationRequest {
                    verifier_id: verifier.id,
                    user_id: user.id,
                    policy_to_check: policy.into(),
                })
                .unwrap();
        }

        let policies: Vec<String> = store
            .requests_for_verifier(verifier.id)
            .unwrap()
            .into_iter()
            .map(|r| r.policy_to_check)
            .collect();
        assert_eq!(policies, vec!["third", "second", "first"]);
    }
}
