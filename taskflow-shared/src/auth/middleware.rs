/// Authentication middleware support for Axum
///
/// The API server's auth layer validates the Bearer token, loads the user
/// (active accounts only) and stores an [`Actor`] in the request extensions.
/// Handlers extract it with the `FromRequestParts` impl below, so a missing
/// actor is rejected with 401 before the handler body runs.
///
/// # Example
///
/// ```ignore
/// use taskflow_shared::auth::policy::Actor;
///
/// async fn handler(actor: Actor) -> String {
///     format!("Hello, user {}", actor.id)
/// }
/// ```

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::policy::Actor;

/// Error type for authentication failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header present
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header is not a Bearer token
    #[error("Invalid authorization format: {0}")]
    InvalidFormat(String),

    /// Token failed validation
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token was valid but the user is unknown or deactivated
    #[error("User not found or inactive")]
    UnknownUser,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": "unauthorized",
            "message": self.to_string(),
        }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Extracts the [`Actor`] placed in request extensions by the auth layer
#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}

/// Parses "Bearer {token}" out of an Authorization header value
pub fn bearer_token(header_value: &str) -> Result<&str, AuthError> {
    header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}
