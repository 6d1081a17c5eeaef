/// Favorite endpoints
///
/// # Endpoints
///
/// - `POST   /v1/tasks/:task_id/favorite` - Mark a task as favorite
/// - `GET    /v1/tasks/:task_id/favorite` - Check whether the caller favorited a task
/// - `DELETE /v1/tasks/:task_id/favorite` - Unmark a favorite
/// - `GET    /v1/favorites` - List the caller's favorited tasks
///
/// Favorites are personal bookmarks; they carry no authorization weight
/// and trigger no activity or notification cascade.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::tasks::{attach_users, TaskView},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use taskflow_shared::{
    auth::policy::Actor,
    models::{favorite::TaskFavorite, task::Task},
};
use uuid::Uuid;

/// Mark a task as favorite
///
/// # Errors
///
/// - `404 Not Found`: No such task
/// - `409 Conflict`: Already favorited
pub async fn add_favorite(
    State(state): State<AppState>,
    actor: Actor,
    Path(task_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if TaskFavorite::exists(&state.db, actor.id, task_id).await? {
        return Err(ApiError::Conflict("Task already favorited".to_string()));
    }

    TaskFavorite::create(&state.db, actor.id, task_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "Task favorited" })),
    ))
}

/// Check whether the caller has favorited a task
pub async fn check_favorite(
    State(state): State<AppState>,
    actor: Actor,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let favorited = TaskFavorite::exists(&state.db, actor.id, task_id).await?;
    Ok(Json(serde_json::json!({ "favorited": favorited })))
}

/// Unmark a favorite
///
/// # Errors
///
/// - `404 Not Found`: Task exists but was not favorited, or no such task
pub async fn remove_favorite(
    State(state): State<AppState>,
    actor: Actor,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let removed = TaskFavorite::delete_pair(&state.db, actor.id, task_id).await?;
    if !removed {
        return Err(ApiError::NotFound("Favorite not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "message": "Favorite removed" })))
}

/// List the caller's favorited tasks, newest-favorited first
pub async fn list_favorites(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Vec<TaskView>>> {
    let tasks = TaskFavorite::list_tasks_for_user(&state.db, actor.id).await?;
    let views = attach_users(&state.db, tasks).await?;
    Ok(Json(views))
}
