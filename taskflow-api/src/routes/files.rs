/// File attachment endpoints
///
/// # Endpoints
///
/// - `POST   /v1/tasks/:task_id/files` - Upload an attachment (multipart)
/// - `GET    /v1/tasks/:task_id/files` - List a task's attachments
/// - `DELETE /v1/files/:id` - Delete an attachment
///
/// Uploads are validated (type allow-list, 10 MiB cap) before any byte
/// reaches the object store, and the store write must succeed before
/// the metadata row exists. A row therefore always points at a stored
/// object; the reverse can briefly be false if the process dies between
/// the two steps.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use taskflow_shared::{
    auth::policy::{self, Actor},
    models::{
        attachment::{CreateFileAttachment, FileAttachment},
        task::Task,
    },
};
use tracing::warn;
use uuid::Uuid;

/// Upload size cap in bytes
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// MIME types accepted for upload
pub const ALLOWED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
];

/// Bodies over the router's size limit surface here as a multipart read
/// error; they must keep the 413 status rather than degrade to a 400.
fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("File exceeds the 10 MiB limit".to_string())
    } else {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err))
    }
}

/// Upload an attachment
///
/// Expects a multipart body with a single `file` part carrying a
/// filename and content type.
///
/// # Errors
///
/// - `400 Bad Request`: No `file` part, or missing filename
/// - `404 Not Found`: No such task
/// - `413 Payload Too Large`: File exceeds 10 MiB
/// - `415 Unsupported Media Type`: Content type not in the allow-list
/// - `502 Bad Gateway`: Object store rejected the upload
pub async fn upload_file(
    State(state): State<AppState>,
    actor: Actor,
    Path(task_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<FileAttachment>)> {
    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let field = loop {
        match multipart.next_field().await.map_err(multipart_error)? {
            Some(field) if field.name() == Some("file") => break field,
            Some(_) => continue,
            None => return Err(ApiError::BadRequest("Missing file part".to_string())),
        }
    };

    let filename = field
        .file_name()
        .map(str::to_string)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing filename".to_string()))?;

    let mime_type = field
        .content_type()
        .map(str::to_string)
        .unwrap_or_else(|| "application/octet-stream".to_string());

    if !ALLOWED_MIME_TYPES.contains(&mime_type.as_str()) {
        return Err(ApiError::UnsupportedMediaType(format!(
            "File type {} is not allowed",
            mime_type
        )));
    }

    let data = field.bytes().await.map_err(multipart_error)?;

    if data.len() > MAX_FILE_SIZE {
        return Err(ApiError::PayloadTooLarge(
            "File exceeds the 10 MiB limit".to_string(),
        ));
    }

    let size = data.len() as i64;
    let stored = state.storage.put(&filename, &mime_type, data).await?;

    let attachment = FileAttachment::create(
        &state.db,
        CreateFileAttachment {
            filename: filename.clone(),
            mime_type,
            size,
            url: stored.url,
            storage_key: stored.key,
            task_id,
        },
    )
    .await?;

    state
        .side_effects
        .file_uploaded(&actor, &task, &filename, size)
        .await?;

    Ok((StatusCode::CREATED, Json(attachment)))
}

/// List a task's attachments
pub async fn list_files(
    State(state): State<AppState>,
    _actor: Actor,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<FileAttachment>>> {
    Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let files = FileAttachment::list_by_task(&state.db, task_id).await?;
    Ok(Json(files))
}

/// Delete an attachment
///
/// The remote object delete is best-effort; the metadata row goes away
/// regardless, leaving at worst an orphaned object in the store.
///
/// # Errors
///
/// - `403 Forbidden`: Caller may not modify the parent task
/// - `404 Not Found`: No such attachment
pub async fn delete_file(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let attachment = FileAttachment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Attachment not found".to_string()))?;

    let task = Task::find_by_id(&state.db, attachment.task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    policy::can_update_task(&actor, &task)?;

    if let Err(e) = state.storage.delete(&attachment.storage_key).await {
        warn!(
            attachment_id = %attachment.id,
            error = %e,
            "Failed to delete remote object, removing metadata anyway"
        );
    }

    FileAttachment::delete(&state.db, id).await?;

    Ok(Json(serde_json::json!({
        "message": "Attachment deleted successfully"
    })))
}
