/// Task endpoints
///
/// # Endpoints
///
/// - `POST   /v1/tasks` - Create a task
/// - `GET    /v1/tasks` - List tasks under the caller's role scope
/// - `GET    /v1/tasks/:id` - Fetch one task
/// - `PUT    /v1/tasks/:id` - Partially update a task
/// - `DELETE /v1/tasks/:id` - Delete a task
///
/// Listing applies the role-derived visibility scope on top of the
/// user-supplied filters, so a USER can never widen their view through
/// filter parameters.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::comments::{attach_authors, CommentView},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use taskflow_shared::{
    auth::policy::{self, Actor, TaskVisibility},
    models::{
        attachment::FileAttachment,
        comment::Comment,
        task::{CreateTask, Task, TaskFilters, TaskPriority, TaskStatus, UpdateTask},
        user::{User, UserSummary},
    },
};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    pub priority: Option<TaskPriority>,

    pub deadline: Option<DateTime<Utc>>,

    pub assigned_to: Option<Uuid>,
}

/// Update task request
///
/// Absent fields are left untouched. `deadline` and `assigned_to` accept
/// an explicit `null` to clear the column, which the double-`Option`
/// distinguishes from the field being absent entirely.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "double_option")]
    pub deadline: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,
}

/// Deserializes a present-but-possibly-null field into `Some(inner)`
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Task list query parameters
///
/// `page` and `limit` fall back to their defaults on non-numeric input
/// rather than failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub search: Option<String>,

    #[serde(default, deserialize_with = "lenient_u32")]
    pub page: Option<u32>,

    #[serde(default, deserialize_with = "lenient_u32")]
    pub limit: Option<u32>,
}

/// Query-string numbers arrive as text; unparseable values become `None`
/// so the handler's defaults apply.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// A task with its creator and assignee stitched on
#[derive(Debug, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,

    pub created_by_user: Option<UserSummary>,

    pub assigned_to_user: Option<UserSummary>,
}

/// A single task expanded with its comments and attachments
#[derive(Debug, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: TaskView,

    pub comments: Vec<CommentView>,

    pub attachments: Vec<FileAttachment>,
}

/// Task list response
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskView>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

/// Loads user summaries for the creators/assignees of a batch of tasks
/// in one query and stitches them onto each task.
pub(crate) async fn attach_users(
    pool: &PgPool,
    tasks: Vec<Task>,
) -> Result<Vec<TaskView>, sqlx::Error> {
    let mut ids: Vec<Uuid> = Vec::new();
    for task in &tasks {
        ids.push(task.created_by);
        if let Some(assignee) = task.assigned_to {
            ids.push(assignee);
        }
    }
    ids.sort_unstable();
    ids.dedup();

    let summaries: HashMap<Uuid, UserSummary> = User::find_summaries(pool, &ids)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    Ok(tasks
        .into_iter()
        .map(|task| TaskView {
            created_by_user: summaries.get(&task.created_by).cloned(),
            assigned_to_user: task
                .assigned_to
                .and_then(|id| summaries.get(&id).cloned()),
            task,
        })
        .collect())
}

/// Rejects an assignee that does not exist or is deactivated
async fn ensure_assignable(state: &AppState, assignee: Uuid) -> ApiResult<()> {
    User::find_active_by_id(&state.db, assignee)
        .await?
        .ok_or_else(|| ApiError::NotFound("Assignee not found or inactive".to_string()))?;
    Ok(())
}

/// Create a task
///
/// # Errors
///
/// - `404 Not Found`: Assignee does not exist or is inactive
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_task(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    req.validate()?;

    if let Some(assignee) = req.assigned_to {
        ensure_assignable(&state, assignee).await?;
    }

    let task = Task::create(
        &state.db,
        CreateTask {
            title: req.title,
            description: req.description.unwrap_or_default(),
            created_by: actor.id,
            assigned_to: req.assigned_to,
            priority: req.priority.unwrap_or(TaskPriority::Medium),
            deadline: req.deadline,
        },
    )
    .await?;

    state.side_effects.task_created(&actor, &task).await?;

    let mut views = attach_users(&state.db, vec![task]).await?;
    let view = views.remove(0);

    Ok((StatusCode::CREATED, Json(view)))
}

/// List tasks visible to the caller
///
/// The caller's role decides the base scope (own tasks for USER, own
/// plus assigned-to-anyone for MANAGER, everything for ADMIN); the query
/// filters narrow it further.
pub async fn list_tasks(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<TaskListResponse>> {
    let scope = TaskVisibility::for_actor(&actor);
    let filters = TaskFilters {
        status: query.status,
        priority: query.priority,
        assigned_to: query.assigned_to,
        search: query.search,
    };

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let result = Task::search(&state.db, &scope, &filters, page, limit).await?;
    let tasks = attach_users(&state.db, result.tasks).await?;

    Ok(Json(TaskListResponse {
        tasks,
        total: result.total,
        page,
        limit,
    }))
}

/// Fetch a single task with its comments and attachments
///
/// Reads by id are open to any authenticated user so that deep links in
/// emails and notifications always resolve.
///
/// # Errors
///
/// - `404 Not Found`: No such task
pub async fn get_task(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskDetail>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let mut views = attach_users(&state.db, vec![task]).await?;
    let view = views.remove(0);

    let comments = attach_authors(&state.db, Comment::list_by_task(&state.db, id).await?).await?;
    let attachments = FileAttachment::list_by_task(&state.db, id).await?;

    Ok(Json(TaskDetail {
        task: view,
        comments,
        attachments,
    }))
}

/// Partially update a task
///
/// # Errors
///
/// - `403 Forbidden`: USER updating a task they neither created nor hold
/// - `404 Not Found`: No such task, or the new assignee does not exist
pub async fn update_task(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskView>> {
    req.validate()?;

    let before = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    policy::can_update_task(&actor, &before)?;

    if let Some(Some(assignee)) = req.assigned_to {
        ensure_assignable(&state, assignee).await?;
    }

    let update = UpdateTask {
        title: req.title,
        description: req.description,
        status: req.status,
        priority: req.priority,
        deadline: req.deadline,
        assigned_to: req.assigned_to,
    };

    let after = Task::update(&state.db, id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    state.side_effects.task_updated(&actor, &before, &after).await?;

    let mut views = attach_users(&state.db, vec![after]).await?;
    Ok(Json(views.remove(0)))
}

/// Delete a task
///
/// Remote attachment objects are deleted best-effort before the row;
/// comments, attachments and task-linked activity rows go with it by
/// CASCADE. The deletion itself is recorded with a null task reference.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is neither the creator nor an ADMIN
/// - `404 Not Found`: No such task
pub async fn delete_task(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    policy::can_delete_task(&actor, &task)?;

    for attachment in FileAttachment::list_by_task(&state.db, id).await? {
        if let Err(e) = state.storage.delete(&attachment.storage_key).await {
            warn!(
                attachment_id = %attachment.id,
                error = %e,
                "Failed to delete remote object, continuing"
            );
        }
    }

    Task::delete(&state.db, id).await?;
    state.side_effects.task_deleted(&actor, &task).await?;

    Ok(Json(serde_json::json!({
        "message": "Task deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_absent_from_null() {
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
        assert_eq!(req.title.as_deref(), Some("New"));
        assert!(req.deadline.is_none());
        assert!(req.assigned_to.is_none());

        let req: UpdateTaskRequest =
            serde_json::from_str(r#"{"deadline": null, "assigned_to": null}"#).unwrap();
        assert_eq!(req.deadline, Some(None));
        assert_eq!(req.assigned_to, Some(None));
    }

    #[test]
    fn test_update_request_parses_explicit_values() {
        let id = Uuid::new_v4();
        let req: UpdateTaskRequest =
            serde_json::from_str(&format!(r#"{{"assigned_to": "{}"}}"#, id)).unwrap();
        assert_eq!(req.assigned_to, Some(Some(id)));
    }

    #[test]
    fn test_list_query_parses_kebab_case_status() {
        let query: ListTasksQuery =
            serde_json::from_str(r#"{"status": "in-progress", "priority": "high"}"#).unwrap();
        assert_eq!(query.status, Some(TaskStatus::InProgress));
        assert_eq!(query.priority, Some(TaskPriority::High));
    }

    #[test]
    fn test_list_query_defaults_non_numeric_pagination() {
        let query: ListTasksQuery =
            serde_json::from_str(r#"{"page": "abc", "limit": "7"}"#).unwrap();
        assert_eq!(query.page, None);
        assert_eq!(query.limit, Some(7));

        let query: ListTasksQuery = serde_json::from_str(r#"{"limit": "-1"}"#).unwrap();
        assert_eq!(query.limit, None);
    }
}
