// src/services/api_error.rs
//! HTTP boundary errors.
//!
//! Service errors are mapped to status code families here: auth failures to
//! 401, duplicate or malformed input to 400, missing records to 404 and
//! everything else to 500 with the detail only written to the log.

use crate::errors::ServiceError;
use axum::{
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::MissingCredential => {
                ApiError::Unauthorized("API Key header is missing".to_string())
            }
            ServiceError::InvalidCredential => {
                ApiError::Unauthorized("Invalid or inactive credential".to_string())
            }
            ServiceError::InvalidCredentials => {
                ApiError::Unauthorized("Incorrect username or password".to_string())
            }
            ServiceError::DuplicateIdentifier(field) => {
                ApiError::BadRequest(format!("{} already registered", capitalize(field)))
            }
            ServiceError::InvalidInput(message) => ApiError::BadRequest(message),
            ServiceError::UserNotFound(id) => {
                ApiError::NotFound(format!("User with ID {} not found", id))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

macro_rules! bad_request_from_rejection {
    ($($rejection:ty),*) => {
        $(
            impl From<$rejection> for ApiError {
                fn from(rejection: $rejection) -> Self {
                    ApiError::BadRequest(rejection.body_text())
                }
            }
        )*
    };
}

bad_request_from_rejection!(JsonRejection, FormRejection, QueryRejection, PathRejection);

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Internal(detail) => {
                log::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: ErrorDetails {
                code: code.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}
