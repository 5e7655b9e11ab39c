// src/models/mod.rs
//! Records held by the persistence boundary and the shapes returned over HTTP.
//!
//! Relationships between users, verifiers and requests are plain integer ids;
//! related records are resolved through the store, never embedded.

pub mod credential;
pub mod user;
pub mod verification_request;
pub mod verifier;
