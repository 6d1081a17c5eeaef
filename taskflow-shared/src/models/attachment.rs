/// File attachment metadata
///
/// The binary itself lives in external object storage; this table only holds
/// the derived URL, the storage key needed to delete the remote object, and
/// descriptive metadata. Rows cascade-delete with their task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileAttachment {
    pub id: Uuid,

    pub filename: String,

    pub mime_type: String,

    /// Size in bytes
    pub size: i64,

    /// Public URL of the stored object
    pub url: String,

    /// External object identifier, used for remote deletion
    pub storage_key: String,

    pub task_id: Uuid,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateFileAttachment {
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub url: String,
    pub storage_key: String,
    pub task_id: Uuid,
}

const ATTACHMENT_COLUMNS: &str =
    "id, filename, mime_type, size, url, storage_key, task_id, created_at";

impl FileAttachment {
    /// Persists attachment metadata after the remote upload succeeded
    pub async fn create(pool: &PgPool, data: CreateFileAttachment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FileAttachment>(&format!(
            r#"
            INSERT INTO file_attachments (filename, mime_type, size, url, storage_key, task_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ATTACHMENT_COLUMNS}
            "#,
        ))
        .bind(data.filename)
        .bind(data.mime_type)
        .bind(data.size)
        .bind(data.url)
        .bind(data.storage_key)
        .bind(data.task_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FileAttachment>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM file_attachments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists a task's attachments, newest first
    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, FileAttachment>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM file_attachments \
             WHERE task_id = $1 ORDER BY created_at DESC"
        ))
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM file_attachments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
