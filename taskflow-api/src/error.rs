/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers should return `Result<T, ApiError>` which automatically
/// converts to appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clients::{MailerError, StorageError};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., duplicate email, duplicate favorite
    Conflict(String),

    /// Payload too large (413) - file upload over the size cap
    PayloadTooLarge(String),

    /// Unsupported media type (415) - file upload with a disallowed type
    UnsupportedMediaType(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Bad gateway (502) - a required upstream dependency failed
    DependencyFailed(String),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            ApiError::UnsupportedMediaType(msg) => write!(f, "Unsupported media type: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::DependencyFailed(msg) => write!(f, "Dependency failed: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                msg,
                None,
            ),
            ApiError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                msg,
                None,
            ),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::DependencyFailed(msg) => {
                tracing::error!("Upstream dependency failed: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "dependency_failed",
                    "An upstream dependency failed".to_string(),
                    None,
                )
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // Check for unique constraint violations
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::Conflict("Email already exists".to_string());
                    }
                    if constraint.contains("task_favorites") {
                        return ApiError::Conflict("Task already favorited".to_string());
                    }
                    return ApiError::Conflict(format!("Constraint violation: {}", constraint));
                }

                // Other database errors are internal
                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert auth errors to API errors
impl From<taskflow_shared::auth::middleware::AuthError> for ApiError {
    fn from(err: taskflow_shared::auth::middleware::AuthError) -> Self {
        match err {
            taskflow_shared::auth::middleware::AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing credentials".to_string())
            }
            taskflow_shared::auth::middleware::AuthError::InvalidFormat(msg) => {
                ApiError::Unauthorized(msg)
            }
            taskflow_shared::auth::middleware::AuthError::InvalidToken(msg) => {
                ApiError::Unauthorized(msg)
            }
            taskflow_shared::auth::middleware::AuthError::UnknownUser => {
                ApiError::Unauthorized("Unknown or deactivated user".to_string())
            }
        }
    }
}

/// Convert policy errors to API errors
impl From<taskflow_shared::auth::policy::PolicyError> for ApiError {
    fn from(err: taskflow_shared::auth::policy::PolicyError) -> Self {
        match err {
            taskflow_shared::auth::policy::PolicyError::Forbidden(reason) => {
                ApiError::Forbidden(reason.to_string())
            }
        }
    }
}

/// Convert password errors to API errors
impl From<taskflow_shared::auth::password::PasswordError> for ApiError {
    fn from(err: taskflow_shared::auth::password::PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<taskflow_shared::auth::jwt::JwtError> for ApiError {
    fn from(err: taskflow_shared::auth::jwt::JwtError) -> Self {
        match err {
            taskflow_shared::auth::jwt::JwtError::Expired => {
                ApiError::Unauthorized("Token expired".to_string())
            }
            taskflow_shared::auth::jwt::JwtError::WrongTokenType { .. } => {
                ApiError::Unauthorized("Wrong token type".to_string())
            }
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Convert validator errors to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed {} validation", e.code)),
                })
            })
            .collect();

        ApiError::ValidationError(details)
    }
}

/// Storage failures during upload propagate to the client
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::DependencyFailed(format!("Object storage: {}", err))
    }
}

/// Mailer failures that are allowed to propagate (verification resend)
impl From<MailerError> for ApiError {
    fn from(err: MailerError) -> Self {
        ApiError::DependencyFailed(format!("Email provider: {}", err))
    }
}
