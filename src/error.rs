//! Error types for Session Gate.
//!
//! Defines a unified error type that maps cleanly to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::auth::CodecError;

/// Message returned for every credential failure, whatever the cause.
pub const BAD_CREDENTIALS: &str = "Incorrect username or password";

/// Unified error type for Session Gate operations.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Malformed credential: {0}")]
    MalformedCredential(#[from] CodecError),

    #[error("Credential mismatch")]
    CredentialMismatch,

    #[error("Missing credential")]
    MissingCredential,

    #[error("Missing originating path cookie")]
    MissingOrigin,

    #[error("Request or connection context is required for session check")]
    MissingTransportContext,

    #[error("Method {0} is not allowed on this route")]
    MethodNotAllowed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GateError {
    /// Whether this error belongs to the credential failure family.
    ///
    /// All of these are reported to the client identically.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            GateError::MalformedCredential(_)
                | GateError::CredentialMismatch
                | GateError::MissingCredential
        )
    }
}

/// Error response body for API clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            GateError::MalformedCredential(_)
            | GateError::CredentialMismatch
            | GateError::MissingCredential => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                BAD_CREDENTIALS.to_string(),
                None,
            ),
            GateError::MissingOrigin => (
                StatusCode::EXPECTATION_FAILED,
                "MISSING_ORIGIN",
                "Unable to find secure route for the requested path".to_string(),
                Some("Reload the source page to authenticate".to_string()),
            ),
            GateError::MissingTransportContext => (
                StatusCode::BAD_REQUEST,
                "MISSING_TRANSPORT_CONTEXT",
                self.to_string(),
                None,
            ),
            GateError::MethodNotAllowed(method) => (
                StatusCode::METHOD_NOT_ALLOWED,
                "METHOD_NOT_ALLOWED",
                format!("Method {} is not allowed", method),
                None,
            ),
            GateError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Configuration error".to_string(),
                Some(msg.clone()),
            ),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for gate operations.
pub type GateResult<T> = Result<T, GateError>;
