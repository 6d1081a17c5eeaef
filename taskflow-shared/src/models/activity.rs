/// Activity log model
///
/// Activity logs are an append-only audit trail of task, comment and file
/// events. Application code only ever inserts rows; they disappear solely via
/// CASCADE when their task is deleted. The task reference is nullable so that
/// a `task_deleted` entry can outlive the task it describes.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE activity_type AS ENUM (
///     'task_created', 'task_updated', 'task_deleted', 'task_assigned',
///     'task_status_changed', 'comment_added', 'file_uploaded'
/// );
///
/// CREATE TABLE activity_logs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     activity_type activity_type NOT NULL,
///     description TEXT,
///     metadata JSONB,
///     user_id UUID NOT NULL REFERENCES users(id),
///     task_id UUID REFERENCES tasks(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Event kind recorded in the activity log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    TaskAssigned,
    TaskStatusChanged,
    CommentAdded,
    FileUploaded,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::TaskCreated => "task_created",
            ActivityType::TaskUpdated => "task_updated",
            ActivityType::TaskDeleted => "task_deleted",
            ActivityType::TaskAssigned => "task_assigned",
            ActivityType::TaskStatusChanged => "task_status_changed",
            ActivityType::CommentAdded => "comment_added",
            ActivityType::FileUploaded => "file_uploaded",
        }
    }
}

/// An immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLog {
    pub id: Uuid,

    pub activity_type: ActivityType,

    /// Human-readable description of the event
    pub description: Option<String>,

    /// Optional structured payload (e.g. filename/size for uploads)
    pub metadata: Option<JsonValue>,

    /// Acting user
    pub user_id: Uuid,

    /// Null for `task_deleted` entries, whose task no longer exists
    pub task_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

/// Input for appending an activity log entry
#[derive(Debug, Clone)]
pub struct CreateActivityLog {
    pub activity_type: ActivityType,
    pub description: String,
    pub metadata: Option<JsonValue>,
    pub user_id: Uuid,
    pub task_id: Option<Uuid>,
}

const ACTIVITY_COLUMNS: &str =
    "id, activity_type, description, metadata, user_id, task_id, created_at";

impl ActivityLog {
    /// Appends an entry; there is no update or delete counterpart
    pub async fn create(pool: &PgPool, data: CreateActivityLog) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ActivityLog>(&format!(
            r#"
            INSERT INTO activity_logs (activity_type, description, metadata, user_id, task_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ACTIVITY_COLUMNS}
            "#,
        ))
        .bind(data.activity_type)
        .bind(data.description)
        .bind(data.metadata)
        .bind(data.user_id)
        .bind(data.task_id)
        .fetch_one(pool)
        .await
    }

    /// Lists a task's activity, newest first
    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ActivityLog>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activity_logs \
             WHERE task_id = $1 ORDER BY created_at DESC"
        ))
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Lists a user's activity, newest first, capped at `limit`
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ActivityLog>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activity_logs \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
