/// Comment model and database operations
///
/// Comments belong to a task and an authoring user; they are mutable only by
/// their author (enforced by the policy layer, not here).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateComment {
    pub content: String,
    pub task_id: Uuid,
    pub user_id: Uuid,
}

const COMMENT_COLUMNS: &str = "id, content, task_id, user_id, created_at, updated_at";

impl Comment {
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (content, task_id, user_id)
            VALUES ($1, $2, $3)
            RETURNING {COMMENT_COLUMNS}
            "#,
        ))
        .bind(data.content)
        .bind(data.task_id)
        .bind(data.user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists a task's comments, newest first
    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE task_id = $1 ORDER BY created_at DESC"
        ))
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Replaces the comment content
    pub async fn update_content(
        pool: &PgPool,
        id: Uuid,
        content: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            r#"
            UPDATE comments
            SET content = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COMMENT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(content)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
