/// Task favorite model
///
/// A favorite is a bare (user, task) join row with a uniqueness constraint;
/// the row's existence is its entire state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::task::Task;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskFavorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TaskFavorite {
    /// Inserts a favorite pair
    ///
    /// The UNIQUE(user_id, task_id) constraint rejects duplicates; callers
    /// check existence first and treat the constraint as a backstop.
    pub async fn create(pool: &PgPool, user_id: Uuid, task_id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TaskFavorite>(
            r#"
            INSERT INTO task_favorites (user_id, task_id)
            VALUES ($1, $2)
            RETURNING id, user_id, task_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(task_id)
        .fetch_one(pool)
        .await
    }

    /// Boolean existence check for a (user, task) pair
    pub async fn exists(pool: &PgPool, user_id: Uuid, task_id: Uuid) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM task_favorites WHERE user_id = $1 AND task_id = $2)",
        )
        .bind(user_id)
        .bind(task_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Removes a favorite pair; returns false when no such favorite existed
    pub async fn delete_pair(
        pool: &PgPool,
        user_id: Uuid,
        task_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM task_favorites WHERE user_id = $1 AND task_id = $2",
        )
        .bind(user_id)
        .bind(task_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the user's favorited tasks, newest-favorited first
    pub async fn list_tasks_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.title, t.description, t.status, t.priority, t.deadline,
                   t.created_by, t.assigned_to, t.created_at, t.updated_at
            FROM task_favorites f
            JOIN tasks t ON t.id = f.task_id
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
