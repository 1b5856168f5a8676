//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::OdbError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub struct AppError(pub OdbError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        let (status, code) = match &self.0 {
            OdbError::NotAuthorized(_) => (StatusCode::FORBIDDEN, "NOT_AUTHORIZED"),
            OdbError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            OdbError::InvalidData { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_DATA"),
            OdbError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            OdbError::DuplicateResource(_) => (StatusCode::CONFLICT, "DUPLICATE_RESOURCE"),
            OdbError::InvalidWorkflowTransition { .. } => {
                (StatusCode::CONFLICT, "INVALID_WORKFLOW_TRANSITION")
            }
            OdbError::ExternalServiceError { .. } => (StatusCode::BAD_GATEWAY, "EXTERNAL_SERVICE"),
            OdbError::SequenceTooLong => (StatusCode::UNPROCESSABLE_ENTITY, "SEQUENCE_TOO_LONG"),
            OdbError::MissingSmartGcalDef(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "MISSING_SMART_GCAL_DEF")
            }
            OdbError::Internal(_) => {
                tracing::error!(error = %message, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        (status, Json(ApiError::new(code, message))).into_response()
    }
}

impl From<OdbError> for AppError {
    fn from(err: OdbError) -> Self {
        AppError(err)
    }
}
