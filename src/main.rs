// src/main.rs

//! # ZK-KYC Engine - Main Entry Point
//!
//! Bookkeeping API for zero-knowledge identity verification. Users and
//! verifier organizations register here, the issuer signs age credentials,
//! and verifiers track verification requests from `pending` to an outcome.
//! Proof generation itself happens client-side and is not part of this
//! service.
//!
//! ## Architecture Overview
//! 1. **Services Layer**: registration, authentication, issuance, request lifecycle and the REST API
//! 2. **Storage Layer**: the `Store` persistence boundary (in-memory)
//! 3. **Cryptography Layer**: PBKDF2 password hashing and HS256 signing
//!
//! ## Environment Variables
//! See [`crate::config`] for the full list. Only `KYC_JWT_SECRET_KEY` is required.

use crate::config::Settings;
use crate::services::api_server::ApiServer;
use crate::storage::InMemoryStore;
use crate::utils::crypto::PasswordHasher;
use dotenv::dotenv;
use std::sync::Arc;

// Module declarations (organized by functional domain)
mod config;        // Environment settings
mod errors;        // Storage and service error types
mod models;        // Data structures
mod services;      // Business logic and API
mod storage;       // Persistence boundary
mod utils;         // Helper functions

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load environment configuration
/// 2. Open the data store
/// 3. Initialize service components
/// 4. Start API server
///
/// # Errors
/// - If `KYC_JWT_SECRET_KEY` is missing or a setting fails to parse
/// - If the bind address is unavailable
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env()?;
    log::info!("Loaded settings: {:?}", settings.issuer_config());

    let hasher = PasswordHasher::new(settings.password_hash_iterations)?;
    let store = Arc::new(InMemoryStore::new());
    log::info!("Using data store {}", settings.database_url);

    let api_server = ApiServer::new(
        store,
        settings.issuer_config(),
        hasher,
        settings.cors_origin_list(),
    );

    log::info!("Available endpoints:");
    log::info!("- POST /users/, POST /users/token, GET /users/me");
    log::info!("- POST /verifiers/, POST /verifiers/token, GET /verifiers/me");
    log::info!("- POST /issuer/issue-credential, POST /issuer/verify-credential");
    log::info!("- POST /verification/request, PUT /verification/request/:request_id");

    api_server.run(settings.bind_address).await?;
    Ok(())
}
