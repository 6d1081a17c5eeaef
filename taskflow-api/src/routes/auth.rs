/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register a new account
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/verify-email` - Confirm an email verification token
/// - `POST /v1/auth/refresh-token` - Exchange a refresh token for new tokens
/// - `POST /v1/auth/logout` - Revoke the stored refresh token
/// - `GET  /v1/auth/profile` - Current user's profile

use crate::{
    app::AppState,
    clients::mailer::{verification_email, OutgoingEmail},
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use taskflow_shared::{
    auth::{generate_verification_token, jwt, password, policy::Actor},
    models::user::{CreateUser, User, UserRole, UserSummary},
};
use tracing::warn;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (also validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Token pair plus the authenticated user
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserSummary,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d), also persisted server-side for revocation
    pub refresh_token: String,
}

/// Email verification request
#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Issues an access/refresh pair and persists the refresh handle
async fn issue_tokens(state: &AppState, user: &User) -> ApiResult<(String, String)> {
    let access_claims = jwt::Claims::new(user.id, user.role, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user.id, user.role, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    User::set_refresh_token(&state.db, user.id, Some(&refresh_token)).await?;

    Ok((access_token, refresh_token))
}

/// Register a new user
///
/// New accounts always start with the USER role; only an existing admin
/// can elevate them. A verification email is sent best-effort.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let password_hash = password::hash_password(&req.password)?;
    let verification_token = generate_verification_token();

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email.clone(),
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            role: UserRole::User,
            email_verification_token: Some(verification_token.clone()),
            email_verification_expires: Some(Utc::now() + Duration::hours(24)),
        },
    )
    .await?;

    // Verification email is best-effort; registration succeeds either way
    let (subject, html) = verification_email(
        &state.config.email.frontend_url,
        &user.first_name,
        &verification_token,
    );
    if let Err(e) = state
        .mailer
        .send(OutgoingEmail {
            to: user.email.clone(),
            subject,
            html,
        })
        .await
    {
        warn!(user_id = %user.id, error = %e, "Failed to send verification email");
    }

    let (access_token, refresh_token) = issue_tokens(&state, &user).await?;

    Ok(Json(AuthResponse {
        user: user.into(),
        access_token,
        refresh_token,
    }))
}

/// Login
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials or deactivated account
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is deactivated".to_string()));
    }

    let (access_token, refresh_token) = issue_tokens(&state, &user).await?;

    Ok(Json(AuthResponse {
        user: user.into(),
        access_token,
        refresh_token,
    }))
}

/// Confirm an email verification token
///
/// # Errors
///
/// - `400 Bad Request`: Unknown or expired token
pub async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<VerifyEmailRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let user = User::find_by_verification_token(&state.db, &req.token)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid verification token".to_string()))?;

    let expired = user
        .email_verification_expires
        .map(|expires| expires < Utc::now())
        .unwrap_or(true);
    if expired {
        return Err(ApiError::BadRequest(
            "Verification token has expired".to_string(),
        ));
    }

    User::mark_email_verified(&state.db, user.id).await?;

    Ok(Json(serde_json::json!({
        "message": "Email verified successfully"
    })))
}

/// Exchange a refresh token for a new token pair
///
/// The presented token must match the handle stored for the user; handles
/// rotate on every refresh, so a stolen old token is useless after the
/// legitimate client refreshes.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired, or revoked refresh token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_active_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown or deactivated user".to_string()))?;

    if user.refresh_token.as_deref() != Some(req.refresh_token.as_str()) {
        return Err(ApiError::Unauthorized(
            "Refresh token has been revoked".to_string(),
        ));
    }

    let (access_token, refresh_token) = issue_tokens(&state, &user).await?;

    Ok(Json(AuthResponse {
        user: user.into(),
        access_token,
        refresh_token,
    }))
}

/// Revoke the stored refresh token
pub async fn logout(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<serde_json::Value>> {
    User::set_refresh_token(&state.db, actor.id, None).await?;

    Ok(Json(serde_json::json!({
        "message": "Logged out successfully"
    })))
}

/// Current user's profile
pub async fn profile(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<UserSummary>> {
    let user = User::find_active_by_id(&state.db, actor.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}
