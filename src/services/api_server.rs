// src/services/api_server.rs
//! API Server for the ZK-KYC engine
//!
//! REST interface over the registration, authentication, issuance and
//! verification-request services. Built on Axum; routes map one-to-one onto
//! service operations:
//! - User and verifier registration, password login and lookup
//! - Credential issuance and signature checks
//! - Verification request creation, status updates and listings
//!
//! Verifier-scoped routes authenticate with the `api-key` header. The `/me`
//! routes take a bearer token from the matching login endpoint.

use crate::config::IssuerConfig;
use crate::errors::ServiceResult;
use crate::models::credential::VerifiableCredential;
use crate::models::user::UserView;
use crate::models::verification_request::{
    StatusUpdate, VerificationRequest, VerificationRequestWithRelations,
};
use crate::models::verifier::{Verifier, VerifierView};
use crate::services::api_error::ApiError;
use crate::services::auth::Authenticator;
use crate::services::credential_issuer::CredentialIssuer;
use crate::services::extractors::{ApiForm, ApiJson, ApiPath, ApiQuery};
use crate::services::registration::Registry;
use crate::services::token_issuer::{AccessToken, TokenIssuer};
use crate::services::verification::VerificationLifecycle;
use crate::storage::Store;
use crate::utils::crypto::PasswordHasher;
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Header carrying a verifier's API key
pub const API_KEY_HEADER: &str = "api-key";

// API request and response structures

/// Request payload for registering a user
#[derive(Deserialize)]
struct CreateUserRequest {
    email: String,
    password: String,
}

/// Request payload for registering a verifier
#[derive(Deserialize)]
struct CreateVerifierRequest {
    company_name: String,
    password: String,
    #[serde(default)]
    webhook_url: Option<String>,
}

/// OAuth2 password-grant form; other grant fields are ignored
#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct EmailQuery {
    email: String,
}

#[derive(Deserialize)]
struct NameQuery {
    name: String,
}

/// Request payload for issuing an age credential
#[derive(Deserialize)]
struct IssueCredentialRequest {
    user_id: i64,
    birth_year: i32,
    #[serde(default)]
    country: Option<String>,
}

/// Response for credential verification
#[derive(Serialize, Deserialize)]
struct VerifyCredentialResponse {
    is_valid: bool,
}

/// Request payload for opening a verification request
#[derive(Deserialize)]
struct CreateVerificationRequest {
    user_id: i64,
    policy: String,
}

#[derive(Deserialize)]
struct VerifierStatusRequest {
    is_active: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Verifier resolved from the `api-key` header.
pub struct ApiKeyVerifier(pub Verifier);

#[async_trait]
impl FromRequestParts<Arc<ApiServer>> for ApiKeyVerifier {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiServer>,
    ) -> Result<Self, Self::Rejection> {
        let api_key = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        let verifier = state.auth.authenticate_api_key(api_key)?;
        Ok(ApiKeyVerifier(verifier))
    }
}

/// Raw token from an `Authorization: Bearer` header; the scheme is matched
/// case-insensitively.
pub struct BearerToken(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split_once(' '))
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
            .map(|(_, token)| token.trim())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ApiError::Unauthorized("Bearer token is missing".to_string())
            })?;
        Ok(BearerToken(token.to_string()))
    }
}

/// Runs password hashing work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// API server state containing all service dependencies
#[derive(Clone)]
pub struct ApiServer {
    /// Sign-up and principal lookups
    registry: Arc<Registry>,

    /// API key, password and bearer token checks
    auth: Arc<Authenticator>,

    /// Credential issuance and verification
    credentials: Arc<CredentialIssuer>,

    /// Verification request lifecycle
    lifecycle: Arc<VerificationLifecycle>,

    /// Origins allowed by the CORS layer
    cors_origins: Vec<String>,
}

impl ApiServer {
    /// Wires every service onto one store.
    ///
    /// # Arguments
    /// * `store` - Persistence boundary shared by all services
    /// * `issuer_config` - Signing secret and issuer identifier
    /// * `hasher` - Password hasher used at sign-up and login
    /// * `cors_origins` - Browser origins allowed to call the API
    pub fn new(
        store: Arc<dyn Store>,
        issuer_config: IssuerConfig,
        hasher: PasswordHasher,
        cors_origins: Vec<String>,
    ) -> Self {
        let tokens = Arc::new(TokenIssuer::new(issuer_config));
        ApiServer {
            registry: Arc::new(Registry::new(store.clone(), hasher.clone())),
            auth: Arc::new(Authenticator::new(store.clone(), hasher, tokens.clone())),
            credentials: Arc::new(CredentialIssuer::new(store.clone(), tokens)),
            lifecycle: Arc::new(VerificationLifecycle::new(store)),
            cors_origins,
        }
    }

    fn cors_layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    log::warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            })
            .collect();

        // Credentials cannot be combined with wildcards, so mirror the request
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
    }

    /// Builds the router with all routes and the CORS layer.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(Self::health_handler))
            // Users
            .route("/users/", post(Self::create_user_handler))
            .route("/users/token", post(Self::user_login_handler))
            .route("/users/by-email/", get(Self::user_by_email_handler))
            .route("/users/me", get(Self::current_user_handler))
            // Verifiers
            .route("/verifiers/", post(Self::create_verifier_handler))
            .route("/verifiers/token", post(Self::verifier_login_handler))
            .route("/verifiers/by-name/", get(Self::verifier_by_name_handler))
            .route("/verifiers/me", get(Self::current_verifier_handler))
            .route("/verifiers/me/status", put(Self::verifier_status_handler))
            // Issuer
            .route("/issuer/issue-credential", post(Self::issue_credential_handler))
            .route("/issuer/verify-credential", post(Self::verify_credential_handler))
            .route("/issuer/credentials/:user_id", get(Self::user_credentials_handler))
            // Verification flow
            .route("/verification/request", post(Self::create_request_handler))
            .route(
                "/verification/request/:request_id",
                get(Self::get_request_handler).put(Self::update_request_handler),
            )
            .route(
                "/verification/requests/user/:user_id",
                get(Self::user_requests_handler),
            )
            .route(
                "/verification/requests/verifier",
                get(Self::verifier_history_handler),
            )
            .with_state(Arc::new(self.clone()))
            .layer(self.cors_layer())
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:8000")
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("API server listening on http://{}", addr);
        axum::serve(listener, self.router()).await
    }

    /// GET /health
    async fn health_handler() -> Json<HealthResponse> {
        Json(HealthResponse { status: "ok" })
    }

    // =====================
    // User Handlers
    // =====================

    /// Registers a user
    ///
    /// # Endpoint
    /// POST /users/
    ///
    /// # Responses
    /// - 201 Created: the new user
    /// - 400 Bad Request: email already registered or malformed
    async fn create_user_handler(
        State(state): State<Arc<ApiServer>>,
        ApiJson(payload): ApiJson<CreateUserRequest>,
    ) -> Result<impl IntoResponse, ApiError> {
        let registry = state.registry.clone();
        let view = blocking(move || {
            let user = registry.register_user(&payload.email, &payload.password)?;
            registry.user_view(&user)
        })
        .await?;
        Ok((StatusCode::CREATED, Json(view)))
    }

    /// Exchanges email and password for a user bearer token
    ///
    /// # Endpoint
    /// POST /users/token (form-encoded `username`, `password`)
    ///
    /// # Responses
    /// - 200 OK: bearer token
    /// - 401 Unauthorized: unknown email or wrong password
    async fn user_login_handler(
        State(state): State<Arc<ApiServer>>,
        ApiForm(form): ApiForm<LoginForm>,
    ) -> Result<Json<AccessToken>, ApiError> {
        let auth = state.auth.clone();
        let token = blocking(move || auth.login_user(&form.username, &form.password)).await?;
        Ok(Json(token))
    }

    /// GET /users/by-email/?email=
    async fn user_by_email_handler(
        State(state): State<Arc<ApiServer>>,
        ApiQuery(query): ApiQuery<EmailQuery>,
    ) -> Result<Json<UserView>, ApiError> {
        let user = state
            .registry
            .user_by_email(&query.email)?
            .ok_or_else(|| ApiError::NotFound("User with that email not found".to_string()))?;
        Ok(Json(state.registry.user_view(&user)?))
    }

    /// GET /users/me with a user bearer token
    async fn current_user_handler(
        State(state): State<Arc<ApiServer>>,
        BearerToken(token): BearerToken,
    ) -> Result<Json<UserView>, ApiError> {
        let user = state.auth.user_from_token(&token)?;
        Ok(Json(state.registry.user_view(&user)?))
    }

    // =====================
    // Verifier Handlers
    // =====================

    /// Registers a verifier and returns it with its API key
    ///
    /// # Endpoint
    /// POST /verifiers/
    ///
    /// # Responses
    /// - 201 Created: the new verifier
    /// - 400 Bad Request: company name already registered
    async fn create_verifier_handler(
        State(state): State<Arc<ApiServer>>,
        ApiJson(payload): ApiJson<CreateVerifierRequest>,
    ) -> Result<impl IntoResponse, ApiError> {
        let registry = state.registry.clone();
        let view = blocking(move || {
            let verifier = registry.register_verifier(
                &payload.company_name,
                &payload.password,
                payload.webhook_url,
            )?;
            registry.verifier_view(&verifier)
        })
        .await?;
        Ok((StatusCode::CREATED, Json(view)))
    }

    /// POST /verifiers/token (form-encoded `username` = company name)
    async fn verifier_login_handler(
        State(state): State<Arc<ApiServer>>,
        ApiForm(form): ApiForm<LoginForm>,
    ) -> Result<Json<AccessToken>, ApiError> {
        let auth = state.auth.clone();
        let token = blocking(move || auth.login_verifier(&form.username, &form.password)).await?;
        Ok(Json(token))
    }

    /// GET /verifiers/by-name/?name=
    async fn verifier_by_name_handler(
        State(state): State<Arc<ApiServer>>,
        ApiQuery(query): ApiQuery<NameQuery>,
    ) -> Result<Json<VerifierView>, ApiError> {
        let verifier = state
            .registry
            .verifier_by_company_name(&query.name)?
            .ok_or_else(|| ApiError::NotFound("Verifier with that name not found".to_string()))?;
        Ok(Json(state.registry.verifier_view(&verifier)?))
    }

    /// GET /verifiers/me with a verifier bearer token
    async fn current_verifier_handler(
        State(state): State<Arc<ApiServer>>,
        BearerToken(token): BearerToken,
    ) -> Result<Json<VerifierView>, ApiError> {
        let verifier = state.auth.verifier_from_token(&token)?;
        Ok(Json(state.registry.verifier_view(&verifier)?))
    }

    /// Suspends or re-enables the calling verifier's API key
    ///
    /// # Endpoint
    /// PUT /verifiers/me/status with a verifier bearer token
    async fn verifier_status_handler(
        State(state): State<Arc<ApiServer>>,
        BearerToken(token): BearerToken,
        ApiJson(payload): ApiJson<VerifierStatusRequest>,
    ) -> Result<Json<VerifierView>, ApiError> {
        let verifier = state.auth.verifier_from_token(&token)?;
        let verifier = state
            .registry
            .set_verifier_active(verifier.id, payload.is_active)?
            .ok_or_else(|| ApiError::NotFound("Verifier not found".to_string()))?;
        Ok(Json(state.registry.verifier_view(&verifier)?))
    }

    // =====================
    // Issuer Handlers
    // =====================

    /// Issues a signed age credential for a user
    ///
    /// # Endpoint
    /// POST /issuer/issue-credential
    ///
    /// # Responses
    /// - 200 OK: the signed credential
    /// - 404 Not Found: unknown user
    async fn issue_credential_handler(
        State(state): State<Arc<ApiServer>>,
        ApiJson(payload): ApiJson<IssueCredentialRequest>,
    ) -> Result<Json<VerifiableCredential>, ApiError> {
        let claims = CredentialIssuer::birth_year_claims(payload.birth_year, payload.country);
        let credential = state
            .credentials
            .issue_credential(payload.user_id, claims)?;
        Ok(Json(credential))
    }

    /// POST /issuer/verify-credential
    async fn verify_credential_handler(
        State(state): State<Arc<ApiServer>>,
        ApiJson(credential): ApiJson<VerifiableCredential>,
    ) -> Json<VerifyCredentialResponse> {
        Json(VerifyCredentialResponse {
            is_valid: state.credentials.verify_credential(&credential),
        })
    }

    /// Returns the signed documents held for a user, ready to present
    ///
    /// # Endpoint
    /// GET /issuer/credentials/:user_id
    async fn user_credentials_handler(
        State(state): State<Arc<ApiServer>>,
        ApiPath(user_id): ApiPath<i64>,
    ) -> Result<Json<Vec<VerifiableCredential>>, ApiError> {
        let credentials = state
            .credentials
            .credentials_for_user(user_id)?
            .iter()
            .map(CredentialIssuer::open_stored)
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(Json(credentials))
    }

    // =====================
    // Verification Flow
    // =====================

    /// Opens a verification request for a user
    ///
    /// # Endpoint
    /// POST /verification/request with `api-key` header
    ///
    /// # Responses
    /// - 200 OK: the pending request
    /// - 401 Unauthorized: missing, unknown or inactive API key
    /// - 404 Not Found: unknown user
    async fn create_request_handler(
        State(state): State<Arc<ApiServer>>,
        ApiKeyVerifier(verifier): ApiKeyVerifier,
        ApiJson(payload): ApiJson<CreateVerificationRequest>,
    ) -> Result<Json<VerificationRequest>, ApiError> {
        let request = state
            .lifecycle
            .create_request(&verifier, payload.user_id, &payload.policy)?;
        Ok(Json(request))
    }

    /// GET /verification/request/:request_id
    async fn get_request_handler(
        State(state): State<Arc<ApiServer>>,
        ApiPath(request_id): ApiPath<i64>,
    ) -> Result<Json<VerificationRequest>, ApiError> {
        state.lifecycle.get(request_id)?.map(Json).ok_or_else(|| {
            ApiError::NotFound(format!("Verification request {} not found", request_id))
        })
    }

    /// Records the outcome of a verification
    ///
    /// # Endpoint
    /// PUT /verification/request/:request_id
    ///
    /// # Responses
    /// - 200 OK: the updated request
    /// - 404 Not Found: no request with that id
    async fn update_request_handler(
        State(state): State<Arc<ApiServer>>,
        ApiPath(request_id): ApiPath<i64>,
        ApiJson(update): ApiJson<StatusUpdate>,
    ) -> Result<Json<VerificationRequest>, ApiError> {
        state
            .lifecycle
            .update(request_id, update)?
            .map(Json)
            .ok_or_else(|| {
                ApiError::NotFound(format!("Verification request {} not found", request_id))
            })
    }

    /// GET /verification/requests/user/:user_id, pending requests for a wallet
    async fn user_requests_handler(
        State(state): State<Arc<ApiServer>>,
        ApiPath(user_id): ApiPath<i64>,
    ) -> Result<Json<Vec<VerificationRequestWithRelations>>, ApiError> {
        Ok(Json(state.lifecycle.pending_for_user(user_id)?))
    }

    /// GET /verification/requests/verifier with `api-key` header
    async fn verifier_history_handler(
        State(state): State<Arc<ApiServer>>,
        ApiKeyVerifier(verifier): ApiKeyVerifier,
    ) -> Result<Json<Vec<VerificationRequestWithRelations>>, ApiError> {
        Ok(Json(state.lifecycle.history_for_verifier(verifier.id)?))
    }
}
