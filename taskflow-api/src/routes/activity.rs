/// Activity log endpoints
///
/// The log is append-only and written exclusively by the side-effect
/// cascade; these endpoints only read it. The task history stitches the
/// acting user onto each entry, the personal feed stitches the task.
///
/// # Endpoints
///
/// - `GET /v1/tasks/:task_id/activity` - A task's history
/// - `GET /v1/activity` - The caller's own recent activity

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use taskflow_shared::{
    auth::policy::Actor,
    models::{
        activity::ActivityLog,
        task::{Task, TaskStatus},
        user::{User, UserSummary},
    },
};
use uuid::Uuid;

/// Query parameters for the personal activity feed
#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

/// An activity entry with the acting user stitched on
#[derive(Debug, Serialize)]
pub struct TaskActivityView {
    #[serde(flatten)]
    pub entry: ActivityLog,

    pub user: Option<UserSummary>,
}

/// Minimal task reference embedded in personal-feed entries
#[derive(Debug, Clone, Serialize)]
pub struct TaskRef {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
}

/// An activity entry with its surviving task stitched on
///
/// `task` is null for entries whose task was deleted.
#[derive(Debug, Serialize)]
pub struct UserActivityView {
    #[serde(flatten)]
    pub entry: ActivityLog,

    pub task: Option<TaskRef>,
}

/// A task's activity history, newest first
pub async fn list_task_activity(
    State(state): State<AppState>,
    _actor: Actor,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<TaskActivityView>>> {
    Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let entries = ActivityLog::list_by_task(&state.db, task_id).await?;

    let mut actor_ids: Vec<Uuid> = entries.iter().map(|e| e.user_id).collect();
    actor_ids.sort_unstable();
    actor_ids.dedup();

    let actors: HashMap<Uuid, UserSummary> = User::find_summaries(&state.db, &actor_ids)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let views = entries
        .into_iter()
        .map(|entry| TaskActivityView {
            user: actors.get(&entry.user_id).cloned(),
            entry,
        })
        .collect();

    Ok(Json(views))
}

/// The caller's own recent activity, newest first, capped at 100 entries
pub async fn list_my_activity(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<Vec<UserActivityView>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);

    let entries = ActivityLog::list_by_user(&state.db, actor.id, limit).await?;

    let mut task_ids: Vec<Uuid> = entries.iter().filter_map(|e| e.task_id).collect();
    task_ids.sort_unstable();
    task_ids.dedup();

    let tasks: HashMap<Uuid, TaskRef> = Task::find_by_ids(&state.db, &task_ids)
        .await?
        .into_iter()
        .map(|t| {
            (
                t.id,
                TaskRef {
                    id: t.id,
                    title: t.title,
                    status: t.status,
                },
            )
        })
        .collect();

    let views = entries
        .into_iter()
        .map(|entry| UserActivityView {
            task: entry.task_id.and_then(|id| tasks.get(&id).cloned()),
            entry,
        })
        .collect();

    Ok(Json(views))
}
