// src/config.rs
//! Process-wide configuration.
//!
//! Settings are read once at startup from `KYC_`-prefixed environment
//! variables (after `.env` has been loaded by `dotenv`) and are immutable for
//! the lifetime of the process.
//!
//! ## Environment Variables
//! - `KYC_JWT_SECRET_KEY`: symmetric signing secret (required)
//! - `KYC_ISSUER_DID`: issuer identifier embedded in credentials
//! - `KYC_DATABASE_URL`: data store location (`memory://`)
//! - `KYC_BIND_ADDRESS`: socket address for the HTTP server
//! - `KYC_PASSWORD_HASH_ITERATIONS`: PBKDF2 iteration count
//! - `KYC_CORS_ORIGINS`: comma-separated list of allowed origins

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::net::SocketAddr;

/// Scheme of the only data store this build ships with.
pub const MEMORY_STORE_SCHEME: &str = "memory://";

/// Signing material shared by the token issuer and the credential signer.
///
/// Constructed once and handed to [`TokenIssuer`](crate::services::token_issuer::TokenIssuer)
/// by value; nothing mutates it afterwards.
#[derive(Clone)]
pub struct IssuerConfig {
    /// HS256 secret used for bearer tokens and credential signatures
    pub signing_secret: Vec<u8>,
    /// Issuer identifier, e.g. "did:example:issuer"
    pub issuer_did: String,
}

impl IssuerConfig {
    pub fn new(signing_secret: impl Into<Vec<u8>>, issuer_did: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            issuer_did: issuer_did.into(),
        }
    }
}

impl std::fmt::Debug for IssuerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerConfig")
            .field("signing_secret", &"<redacted>")
            .field("issuer_did", &self.issuer_did)
            .finish()
    }
}

/// Server settings as loaded from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub jwt_secret_key: String,
    pub issuer_did: String,
    pub database_url: String,
    pub bind_address: SocketAddr,
    pub password_hash_iterations: u32,
    /// Comma-separated origins allowed by the CORS layer
    pub cors_origins: String,
}

impl Settings {
    /// Loads settings from `KYC_*` environment variables, applying defaults
    /// for everything except the signing secret.
    ///
    /// # Errors
    /// Returns `ConfigError` if:
    /// - `KYC_JWT_SECRET_KEY` is missing or empty
    /// - a value fails to parse (bind address, iteration count)
    /// - the iteration count is zero
    /// - the database URL names an unsupported store
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("issuer_did", "did:example:issuer")?
            .set_default("database_url", MEMORY_STORE_SCHEME)?
            .set_default("bind_address", "127.0.0.1:8000")?
            .set_default("password_hash_iterations", 100_000)?
            .set_default(
                "cors_origins",
                "http://localhost,http://localhost:5173,http://localhost:8081",
            )?
            .add_source(Environment::with_prefix("KYC"))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret_key.is_empty() {
            return Err(ConfigError::Message(
                "KYC_JWT_SECRET_KEY must not be empty".into(),
            ));
        }
        if self.password_hash_iterations == 0 {
            return Err(ConfigError::Message(
                "KYC_PASSWORD_HASH_ITERATIONS must be greater than zero".into(),
            ));
        }
        if !self.database_url.starts_with(MEMORY_STORE_SCHEME) {
            return Err(ConfigError::Message(format!(
                "unsupported data store '{}', only {} is available",
                self.database_url, MEMORY_STORE_SCHEME
            )));
        }
        Ok(())
    }

    /// Splits `cors_origins` into trimmed, non-empty entries.
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn issuer_config(&self) -> IssuerConfig {
        IssuerConfig::new(self.jwt_secret_key.as_bytes(), self.issuer_did.clone())
    }
}
