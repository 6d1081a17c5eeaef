/// Task model and database operations
///
/// Tasks are the core entity of TaskFlow. Every task has a creator, an optional
/// assignee, a status and a priority; comments, activity logs and file
/// attachments cascade-delete with their task.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in-progress', 'review', 'completed');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     description TEXT NOT NULL,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     deadline TIMESTAMPTZ,
///     created_by UUID NOT NULL REFERENCES users(id),
///     assigned_to UUID REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Listing and visibility
///
/// `Task::search` composes the caller's role scope (a [`TaskVisibility`]
/// predicate from the authorization policy) with the user-supplied filters by
/// conjunction, so the scoping predicate can never be accidentally dropped for
/// a given role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::policy::TaskVisibility;

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Completed,
}

impl TaskStatus {
    /// Converts status to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Review => "review",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    pub title: String,

    pub description: String,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    /// Optional due date
    pub deadline: Option<DateTime<Utc>>,

    /// Creator (required)
    pub created_by: Uuid,

    /// Assignee (optional)
    pub assigned_to: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
///
/// Status always starts at `todo`; priority defaults to `medium`.
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub priority: TaskPriority,
    pub deadline: Option<DateTime<Utc>>,
}

/// Partial update of a task
///
/// Outer `None` leaves the field untouched. For the nullable columns the inner
/// `Option` distinguishes "set to a value" from "clear" (explicit null).
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub assigned_to: Option<Option<Uuid>>,
}

impl UpdateTask {
    /// True when no field is present in the payload
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.deadline.is_none()
            && self.assigned_to.is_none()
    }
}

/// User-supplied narrowing filters for task listing
///
/// All filters are optional and combined with AND; the role scope is applied
/// on top of them.
#[derive(Debug, Clone, Default)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,

    /// Case-insensitive substring match over title and description
    pub search: Option<String>,
}

/// A page of tasks plus the total number of rows matching the predicate
#[derive(Debug, Clone)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: i64,
}

const TASK_COLUMNS: &str = "id, title, description, status, priority, deadline, \
     created_by, assigned_to, created_at, updated_at";

/// Renders the WHERE clause for a scope + filters combination.
///
/// Returns the clause (possibly empty) with numbered placeholders; binds must
/// be applied in the same order: scope user, status, priority, assigned_to,
/// search pattern.
fn render_where(scope: &TaskVisibility, filters: &TaskFilters) -> String {
    let mut conditions: Vec<String> = Vec::new();
    let mut n = 0u32;

    match scope {
        TaskVisibility::All => {}
        TaskVisibility::CreatedOrAssigned(_) => {
            n += 1;
            conditions.push(format!("(created_by = ${n} OR assigned_to = ${n})"));
        }
        TaskVisibility::CreatedOrAnyAssigned(_) => {
            n += 1;
            conditions.push(format!("(created_by = ${n} OR assigned_to IS NOT NULL)"));
        }
    }

    if filters.status.is_some() {
        n += 1;
        conditions.push(format!("status = ${n}"));
    }
    if filters.priority.is_some() {
        n += 1;
        conditions.push(format!("priority = ${n}"));
    }
    if filters.assigned_to.is_some() {
        n += 1;
        conditions.push(format!("assigned_to = ${n}"));
    }
    if filters.search.is_some() {
        n += 1;
        conditions.push(format!("(title ILIKE ${n} OR description ILIKE ${n})"));
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

impl Task {
    /// Creates a new task
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, priority, deadline, created_by, assigned_to)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority)
        .bind(data.deadline)
        .bind(data.created_by)
        .bind(data.assigned_to)
        .fetch_one(pool)
        .await
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds all tasks in a set of IDs, in no particular order
    pub async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Searches tasks under a visibility scope with optional filters
    ///
    /// Results are ordered newest-created first and paginated; the total count
    /// over the same predicate is returned alongside the page.
    pub async fn search(
        pool: &PgPool,
        scope: &TaskVisibility,
        filters: &TaskFilters,
        page: u32,
        limit: u32,
    ) -> Result<TaskPage, sqlx::Error> {
        let where_clause = render_where(scope, filters);
        let offset = (page.max(1) - 1) as i64 * limit as i64;
        let search_pattern = filters.search.as_ref().map(|s| format!("%{}%", s));

        let select_sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks {where_clause} \
             ORDER BY created_at DESC LIMIT {} OFFSET {}",
            limit as i64, offset
        );
        let count_sql = format!("SELECT COUNT(*) FROM tasks {where_clause}");

        let mut select = sqlx::query_as::<_, Task>(&select_sql);
        let mut count = sqlx::query_as::<_, (i64,)>(&count_sql);

        if let Some(user_id) = scope.scoping_user() {
            select = select.bind(user_id);
            count = count.bind(user_id);
        }
        if let Some(status) = filters.status {
            select = select.bind(status);
            count = count.bind(status);
        }
        if let Some(priority) = filters.priority {
            select = select.bind(priority);
            count = count.bind(priority);
        }
        if let Some(assigned_to) = filters.assigned_to {
            select = select.bind(assigned_to);
            count = count.bind(assigned_to);
        }
        if let Some(ref pattern) = search_pattern {
            select = select.bind(pattern);
            count = count.bind(pattern);
        }

        let tasks = select.fetch_all(pool).await?;
        let (total,) = count.fetch_one(pool).await?;

        Ok(TaskPage { tasks, total })
    }

    /// Applies a partial update, leaving absent fields untouched
    ///
    /// Returns the updated row, or `None` when the task does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        let mut sets: Vec<String> = vec!["updated_at = NOW()".to_string()];
        let mut n = 1u32; // $1 is the task id

        if data.title.is_some() {
            n += 1;
            sets.push(format!("title = ${n}"));
        }
        if data.description.is_some() {
            n += 1;
            sets.push(format!("description = ${n}"));
        }
        if data.status.is_some() {
            n += 1;
            sets.push(format!("status = ${n}"));
        }
        if data.priority.is_some() {
            n += 1;
            sets.push(format!("priority = ${n}"));
        }
        if data.deadline.is_some() {
            n += 1;
            sets.push(format!("deadline = ${n}"));
        }
        if data.assigned_to.is_some() {
            n += 1;
            sets.push(format!("assigned_to = ${n}"));
        }

        let sql = format!(
            "UPDATE tasks SET {} WHERE id = $1 RETURNING {TASK_COLUMNS}",
            sets.join(", ")
        );

        let mut query = sqlx::query_as::<_, Task>(&sql).bind(id);

        if let Some(title) = data.title {
            query = query.bind(title);
        }
        if let Some(description) = data.description {
            query = query.bind(description);
        }
        if let Some(status) = data.status {
            query = query.bind(status);
        }
        if let Some(priority) = data.priority {
            query = query.bind(priority);
        }
        if let Some(deadline) = data.deadline {
            // Inner None clears the column
            query = query.bind(deadline);
        }
        if let Some(assigned_to) = data.assigned_to {
            query = query.bind(assigned_to);
        }

        query.fetch_optional(pool).await
    }

    /// Deletes a task
    ///
    /// Comments, attachments and task-linked activity logs are removed by
    /// CASCADE; the caller records the deletion event afterwards with a null
    /// task reference.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
