//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the unified error type for all API endpoints. It implements
//! `axum::response::IntoResponse` to produce structured JSON error responses
//! with appropriate HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use critic_core::CoreError;
use critic_storage::StorageError;

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "BAD_REQUEST").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API errors with HTTP status code mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Malformed request input (400).
    #[error("{0}")]
    BadRequest(String),

    /// The caller must be identified (401).
    #[error("{0}")]
    AuthRequired(String),

    /// The caller lacks a permission (403).
    #[error("{0}")]
    Forbidden(String),

    /// Entity not found or not visible (404).
    #[error("{0}")]
    NotFound(String),

    /// The operation does not apply to this kind of resource (405).
    #[error("{0}")]
    MethodNotAllowed(String),

    /// Resource conflict (409).
    #[error("{0}")]
    Conflict(String),

    /// Syntactically valid reference that cannot be followed (412).
    #[error("{0}")]
    PreconditionFailed(String),

    /// Well-formed input naming something unusable (422).
    #[error("{0}")]
    UnprocessableEntity(String),

    /// Internal server error (500).
    #[error("{0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthRequired(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::AuthRequired(_) => "AUTH_REQUIRED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::PreconditionFailed(_) => "PRECONDITION_FAILED",
            ApiError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = ApiErrorDetail {
            code: self.code().to_string(),
            message: self.to_string(),
        };

        let body = serde_json::json!({
            "success": false,
            "error": detail,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::ChangeNotFound(id) => ApiError::NotFound(format!("Not found: {id}")),
            StorageError::AccountNotFound(id) => {
                ApiError::NotFound(format!("Account '{id}' not found"))
            }
            StorageError::GroupNotFound(uuid) => {
                ApiError::NotFound(format!("Group {uuid} not found"))
            }
            StorageError::MissingMetaObject { .. } => {
                ApiError::PreconditionFailed(err.to_string())
            }
            StorageError::DuplicateChange(_)
            | StorageError::DuplicateUsername(_)
            | StorageError::DuplicateGroupName(_) => ApiError::Conflict(err.to_string()),
            _ => ApiError::InternalError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use critic_core::ObjectId;

    #[test]
    fn missing_meta_object_is_precondition_failed() {
        let err: ApiError = StorageError::MissingMetaObject {
            change: 3,
            meta: ObjectId::from_bytes([1; 20]).to_hex(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::PRECONDITION_FAILED);
        assert!(err.to_string().contains("0101010101"));
    }

    #[test]
    fn vanished_group_is_not_found() {
        let err: ApiError = StorageError::GroupNotFound("abc".into()).into();
        assert_eq!(err, ApiError::NotFound("Group abc not found".into()));
    }

    #[test]
    fn option_errors_are_bad_requests() {
        let err: ApiError = CoreError::UnknownOption {
            token: "NOPE".into(),
        }
        .into();
        assert_eq!(err.code(), "BAD_REQUEST");
        assert!(err.to_string().contains("NOPE"));
    }
}
