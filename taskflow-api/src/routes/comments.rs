/// Comment endpoints
///
/// # Endpoints
///
/// - `GET    /v1/tasks/:task_id/comments` - List a task's comments
/// - `POST   /v1/tasks/:task_id/comments` - Add a comment
/// - `PUT    /v1/comments/:id` - Edit a comment (author only)
/// - `DELETE /v1/comments/:id` - Delete a comment (author only)
///
/// Comments are strictly author-owned: not even an ADMIN can edit or
/// delete someone else's words.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use taskflow_shared::{
    auth::policy::{self, Actor},
    models::{
        comment::{Comment, CreateComment},
        task::Task,
        user::{User, UserSummary},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Create or edit comment request
#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 2000, message = "Comment must be 1-2000 characters"))]
    pub content: String,
}

/// A comment with its author stitched on
#[derive(Debug, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,

    pub user: Option<UserSummary>,
}

/// Loads author summaries for a batch of comments in one query and
/// stitches them onto each comment.
pub(crate) async fn attach_authors(
    pool: &PgPool,
    comments: Vec<Comment>,
) -> Result<Vec<CommentView>, sqlx::Error> {
    let mut ids: Vec<Uuid> = comments.iter().map(|c| c.user_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let authors: HashMap<Uuid, UserSummary> = User::find_summaries(pool, &ids)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    Ok(comments
        .into_iter()
        .map(|comment| CommentView {
            user: authors.get(&comment.user_id).cloned(),
            comment,
        })
        .collect())
}

/// List a task's comments, newest first
pub async fn list_comments(
    State(state): State<AppState>,
    _actor: Actor,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<CommentView>>> {
    Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let comments = Comment::list_by_task(&state.db, task_id).await?;
    let views = attach_authors(&state.db, comments).await?;
    Ok(Json(views))
}

/// Add a comment to a task
///
/// # Errors
///
/// - `404 Not Found`: No such task
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(task_id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    req.validate()?;

    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let comment = Comment::create(
        &state.db,
        CreateComment {
            content: req.content,
            user_id: actor.id,
            task_id,
        },
    )
    .await?;

    state
        .side_effects
        .comment_added(&actor, &task, &comment)
        .await?;

    let mut views = attach_authors(&state.db, vec![comment]).await?;
    Ok((StatusCode::CREATED, Json(views.remove(0))))
}

/// Edit a comment
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not the author
/// - `404 Not Found`: No such comment
pub async fn update_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<Comment>> {
    req.validate()?;

    let comment = Comment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    policy::can_mutate_comment(&actor, &comment)?;

    let updated = Comment::update_content(&state.db, id, &req.content)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    Ok(Json(updated))
}

/// Delete a comment
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not the author
/// - `404 Not Found`: No such comment
pub async fn delete_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let comment = Comment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    policy::can_mutate_comment(&actor, &comment)?;

    Comment::delete(&state.db, id).await?;

    Ok(Json(serde_json::json!({
        "message": "Comment deleted successfully"
    })))
}
