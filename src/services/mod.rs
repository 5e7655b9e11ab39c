// src/services/mod.rs
//! Business logic and the HTTP surface over it.

pub mod api_error;
pub mod api_server;
pub mod auth;
pub mod credential_issuer;
pub mod extractors;
pub mod registration;
pub mod token_issuer;
pub mod verification;
