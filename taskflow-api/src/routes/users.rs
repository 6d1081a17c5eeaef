/// User endpoints
///
/// # Endpoints
///
/// - `GET /v1/users` - List active users (MANAGER/ADMIN only)
/// - `GET /v1/users/:id` - Fetch one user (self, or MANAGER/ADMIN)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Json,
};
use taskflow_shared::{
    auth::policy::{self, Actor},
    models::user::{User, UserSummary},
};
use uuid::Uuid;

/// List all active users
///
/// Used to populate assignee pickers, hence restricted to roles that can
/// assign tasks to other people.
///
/// # Errors
///
/// - `403 Forbidden`: Caller has the USER role
pub async fn list_users(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Vec<UserSummary>>> {
    policy::can_list_users(&actor)?;

    let users = User::list_active(&state.db).await?;
    Ok(Json(users))
}

/// Fetch a single user
///
/// # Errors
///
/// - `403 Forbidden`: USER role requesting someone else's record
/// - `404 Not Found`: No such user
pub async fn get_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserSummary>> {
    policy::can_view_user(&actor, id)?;

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}
